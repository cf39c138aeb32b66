//! End-to-end pipeline behavior against in-memory oracles.

use std::sync::Mutex;

use async_trait::async_trait;
use demangle_core::{
    AsmLine, DemangleError, DemangleEvent, Demangler, EventSink, Oracle, OracleError, StoreError,
    TableOracle,
};
use proptest::prelude::*;
use rstest as _;
#[cfg(feature = "serde")]
use serde as _;
use serde_json::json;
use thiserror as _;
use tracing as _;

fn destructor_table() -> TableOracle {
    TableOracle::new()
        .with("_Z6squarei", "square(int)")
        .with("_ZN6NormalD0Ev", "Normal::~Normal() [deleting destructor]")
        .with("_ZN6NormalD2Ev", "Normal::~Normal() [base object destructor]")
        .with("_ZdlPv", "operator delete(void*)")
        .with("_ZdlPvm", "operator delete(void*, unsigned long)")
        .with("_Z7caller1v", "caller1()")
        .with("_Z7caller2P6Normal", "caller2(Normal*)")
}

#[derive(Default)]
struct RecordingOracle {
    table: TableOracle,
    calls: Mutex<Vec<Vec<String>>>,
}

impl RecordingOracle {
    fn new(table: TableOracle) -> Self {
        Self {
            table,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Oracle for RecordingOracle {
    async fn demangle_batch(&self, tokens: &[String]) -> Result<Vec<String>, OracleError> {
        self.calls.lock().unwrap().push(tokens.to_vec());
        self.table.demangle_batch(tokens).await
    }
}

struct FailingOracle;

#[async_trait]
impl Oracle for FailingOracle {
    async fn demangle_batch(&self, _tokens: &[String]) -> Result<Vec<String>, OracleError> {
        Err(OracleError::Io {
            program: "c++filt".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed"),
        })
    }
}

struct ShortOracle;

#[async_trait]
impl Oracle for ShortOracle {
    async fn demangle_batch(&self, tokens: &[String]) -> Result<Vec<String>, OracleError> {
        Ok(tokens.iter().skip(1).cloned().collect())
    }
}

#[derive(Default)]
struct RecordingSink {
    events: Mutex<Vec<DemangleEvent>>,
}

impl EventSink for RecordingSink {
    fn on_event(&self, event: DemangleEvent) {
        self.events.lock().unwrap().push(event);
    }
}

fn lines(text: &[&str]) -> Vec<String> {
    text.iter().map(ToString::to_string).collect()
}

#[tokio::test]
async fn one_line_without_symbols() {
    let oracle = RecordingOracle::new(destructor_table());
    let demangler = Demangler::new(&oracle);

    let out = demangler.process(lines(&["Hello, World!"])).await.unwrap();

    assert_eq!(out, vec!["Hello, World!"]);
    assert!(oracle.calls().is_empty());
}

#[tokio::test]
async fn one_label_and_some_asm() {
    let demangler = Demangler::new(destructor_table());
    let out = demangler
        .process(lines(&["_Z6squarei:", "  ret"]))
        .await
        .unwrap();
    assert_eq!(out, vec!["square(int):", "  ret"]);
}

#[tokio::test]
async fn one_label_and_use_of_a_label() {
    let demangler = Demangler::new(destructor_table());
    let out = demangler
        .process(lines(&["_Z6squarei:", "  mov eax, $_Z6squarei"]))
        .await
        .unwrap();
    assert_eq!(out, vec!["square(int):", "  mov eax, $square(int)"]);
}

#[tokio::test]
async fn two_destructors() {
    let oracle = RecordingOracle::new(destructor_table());
    let demangler = Demangler::new(&oracle);

    let out = demangler
        .process(lines(&[
            "_ZN6NormalD0Ev:",
            "  callq _ZdlPv",
            "_Z7caller1v:",
            "  rep ret",
            "_Z7caller2P6Normal:",
            "  cmp rax, OFFSET FLAT:_ZN6NormalD0Ev",
            "  jmp _ZdlPvm",
            "_ZN6NormalD2Ev:",
            "  rep ret",
        ]))
        .await
        .unwrap();

    assert_eq!(
        out,
        vec![
            "Normal::~Normal() [deleting destructor]:",
            "  callq operator delete(void*)",
            "caller1():",
            "  rep ret",
            "caller2(Normal*):",
            "  cmp rax, OFFSET FLAT:Normal::~Normal() [deleting destructor]",
            "  jmp operator delete(void*, unsigned long)",
            "Normal::~Normal() [base object destructor]:",
            "  rep ret",
        ]
    );
    assert_eq!(
        oracle.calls(),
        vec![lines(&[
            "_ZN6NormalD0Ev",
            "_ZdlPv",
            "_Z7caller1v",
            "_Z7caller2P6Normal",
            "_ZdlPvm",
            "_ZN6NormalD2Ev",
        ])]
    );
}

#[tokio::test]
async fn reference_before_definition_uses_same_name() {
    let demangler = Demangler::new(destructor_table());
    let out = demangler
        .process(lines(&["  call _Z6squarei", "", "  _Z6squarei:  "]))
        .await
        .unwrap();
    assert_eq!(out, vec!["  call square(int)", "", "  square(int):  "]);
}

#[tokio::test]
async fn unresolvable_tokens_pass_through() {
    let demangler = Demangler::new(TableOracle::new());
    let out = demangler
        .process(lines(&["_Z3barv:", "  call _Z3bazv"]))
        .await
        .unwrap();
    assert_eq!(out, vec!["_Z3barv:", "  call _Z3bazv"]);
}

#[tokio::test]
async fn non_text_fields_pass_through() {
    let source = json!({"file": null, "line": 2, "column": 5, "mainsource": true});
    let listing = vec![
        AsmLine::new("_Z6squarei:").with_field("source", json!(null)),
        AsmLine::new("  imul edi, edi").with_field("source", source.clone()),
        AsmLine::new("  jmp _Z6squarei")
            .with_field("source", "not an object")
            .with_field("opcodes", json!(["e9", "00"])),
    ];
    let demangler = Demangler::new(destructor_table());

    let out = demangler.process(listing.clone()).await.unwrap();

    assert_eq!(out.len(), 3);
    assert_eq!(out[0].text, "square(int):");
    assert_eq!(out[1].text, "  imul edi, edi");
    assert_eq!(out[2].text, "  jmp square(int)");
    for (got, want) in out.iter().zip(&listing) {
        assert_eq!(got.fields, want.fields);
    }
    assert_eq!(out[1].fields["source"], source);
}

#[tokio::test]
async fn oracle_failure_fails_the_whole_run() {
    let demangler = Demangler::new(FailingOracle);
    let err = demangler
        .process(lines(&["_Z6squarei:", "  ret"]))
        .await
        .unwrap_err();
    assert!(matches!(err, DemangleError::Oracle(OracleError::Io { .. })));
    assert!(!err.is_length_mismatch());
}

#[tokio::test]
async fn oracle_failure_is_not_reached_without_symbols() {
    let demangler = Demangler::new(FailingOracle);
    let out = demangler.process(lines(&["  ret"])).await.unwrap();
    assert_eq!(out, vec!["  ret"]);
}

#[tokio::test]
async fn short_answer_is_a_length_mismatch() {
    let demangler = Demangler::new(ShortOracle);
    let err = demangler
        .process(lines(&["_Z1av:", "  call _Z1bv"]))
        .await
        .unwrap_err();
    assert!(err.is_length_mismatch());
    assert!(matches!(
        err,
        DemangleError::Store(StoreError::LengthMismatch {
            expected: 2,
            actual: 1
        })
    ));
}

#[tokio::test]
async fn events_follow_pipeline_order() {
    let sink = RecordingSink::default();
    let demangler = Demangler::new(destructor_table()).with_sink(&sink);

    demangler
        .process(lines(&["_Z6squarei:", "  ret", "  jmp _Z6squarei"]))
        .await
        .unwrap();
    demangler.process(lines(&["  ret"])).await.unwrap();

    assert_eq!(
        *sink.events.lock().unwrap(),
        vec![
            DemangleEvent::ScanComplete {
                lines: 3,
                symbols: 1
            },
            DemangleEvent::BatchResolved { symbols: 1 },
            DemangleEvent::RewriteComplete { rewritten_lines: 2 },
            DemangleEvent::ScanComplete {
                lines: 1,
                symbols: 0
            },
            DemangleEvent::BatchSkipped,
            DemangleEvent::RewriteComplete { rewritten_lines: 0 },
        ]
    );
}

#[tokio::test]
async fn concurrent_runs_do_not_share_symbols() {
    let oracle = RecordingOracle::new(destructor_table());
    let demangler = Demangler::new(&oracle);

    let (first, second) = tokio::join!(
        demangler.process(lines(&["_Z6squarei:", "  ret"])),
        demangler.process(lines(&["  callq _ZdlPv"])),
    );

    assert_eq!(first.unwrap(), vec!["square(int):", "  ret"]);
    assert_eq!(second.unwrap(), vec!["  callq operator delete(void*)"]);

    let mut calls = oracle.calls();
    calls.sort();
    assert_eq!(calls, vec![lines(&["_Z6squarei"]), lines(&["_ZdlPv"])]);
}

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
        .block_on(future)
}

const TOKENS: [&str; 4] = ["_Z1av", "_Z1bv", "_ZN1c1dEv", "_Z6squarei"];

fn table() -> TableOracle {
    TableOracle::new()
        .with("_Z1av", "a()")
        .with("_Z1bv", "b()")
        .with("_ZN1c1dEv", "c::d()")
        .with("_Z6squarei", "square(int)")
}

proptest! {
    #[test]
    fn lines_without_tokens_are_unchanged(text in prop::collection::vec("[ a-zA-Y0-9_$.,:#@\\[\\]+-]{0,40}", 0..16)) {
        let oracle = RecordingOracle::new(table());
        let out = block_on(Demangler::new(&oracle).process(text.clone())).unwrap();
        prop_assert_eq!(out, text);
        prop_assert!(oracle.calls().is_empty());
    }

    #[test]
    fn every_occurrence_gets_the_same_name(
        picks in prop::collection::vec((0..TOKENS.len(), any::<bool>()), 1..20)
    ) {
        let listing: Vec<String> = picks
            .iter()
            .map(|&(i, def)| {
                if def {
                    format!("{}:", TOKENS[i])
                } else {
                    format!("  call {}, ${}", TOKENS[i], TOKENS[i])
                }
            })
            .collect();
        let oracle = RecordingOracle::new(table());

        let out = block_on(Demangler::new(&oracle).process(listing.clone())).unwrap();

        prop_assert_eq!(out.len(), listing.len());
        let names = table();
        for (line, &(i, def)) in out.iter().zip(&picks) {
            let name = names.demangle_one(TOKENS[i]);
            let expected = if def {
                format!("{name}:")
            } else {
                format!("  call {name}, ${name}")
            };
            prop_assert_eq!(line, &expected);
        }

        let mut first_seen: Vec<String> = Vec::new();
        for &(i, _) in &picks {
            if !first_seen.iter().any(|t| t == TOKENS[i]) {
                first_seen.push(TOKENS[i].to_string());
            }
        }
        prop_assert_eq!(oracle.calls(), vec![first_seen]);
    }
}
