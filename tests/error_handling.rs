use simdex::{
    Corpus, FingerprintConfig, FingerprintError, IndexError, SimdexConfig, SimdexError,
    SimilarityIndex, TokenCode, TokenizeError, compare_files,
};

fn strict_config() -> SimdexConfig {
    let mut config = SimdexConfig::default();
    config.tokenizer.strict = true;
    config
}

fn bytes(src: &[u8]) -> Result<Vec<TokenCode>, TokenizeError> {
    Ok(src.iter().map(|&b| TokenCode::from(b)).collect())
}

#[test]
fn zero_window_parameters_are_rejected() {
    assert!(matches!(
        SimilarityIndex::new(0, 3),
        Err(IndexError::Config(FingerprintError::InvalidConfigK { k: 0 }))
    ));

    let mut config = SimdexConfig::default();
    config.fingerprint.w = 0;
    assert!(matches!(
        Corpus::new(&config),
        Err(SimdexError::Index(IndexError::Config(
            FingerprintError::InvalidConfigW { w: 0 }
        )))
    ));
}

#[test]
fn pair_with_unknown_name_is_not_found() {
    let corpus = Corpus::with_tokenizer(FingerprintConfig::new(3, 3), bytes).expect("corpus");
    corpus.add_source("known", b"some content here").expect("add");

    for (left, right) in [("known", "missing"), ("missing", "known")] {
        let err = corpus.pair(left, right).expect_err("unknown name");
        assert!(
            matches!(&err, SimdexError::Index(IndexError::NotFound { name }) if name == "missing"),
            "unexpected error: {err}"
        );
    }
}

#[test]
fn strict_tokenizer_failure_is_surfaced_and_leaves_corpus_unchanged() {
    let corpus = Corpus::new(&strict_config()).expect("corpus");
    corpus.add_source("good.js", b"let x = 1;").expect("valid source");

    let err = corpus.add_source("bad.js", b"let = ;").expect_err("syntax error");
    match err {
        SimdexError::Tokenize { document, source } => {
            assert_eq!(document, "bad.js");
            assert!(matches!(source, TokenizeError::Syntax { .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(corpus.len(), 1);
    assert!(corpus.read().document_id("bad.js").is_none());
}

#[test]
fn lenient_tokenizer_accepts_broken_source() {
    let corpus = Corpus::new(&SimdexConfig::default()).expect("corpus");
    corpus.add_source("broken.js", b"let = ;").expect("lenient by default");
    assert_eq!(corpus.len(), 1);
}

#[test]
fn malformed_snapshot_bytes_are_rejected() {
    let cases: [&[u8]; 4] = [
        b"",
        b"{\"k\":3,\"w\":3,\"identifiers\":[]}",
        b"{\"k\":3,\"w\":3,\"identifiers\":[[\"a\",5]],\"index\":[]}",
        &[0x28, 0xB5, 0x2F, 0xFD, 0xFF],
    ];
    for case in cases {
        let result = Corpus::from_snapshot(case, Box::new(bytes));
        assert!(
            matches!(result, Err(SimdexError::Index(IndexError::MalformedSnapshot(_)))),
            "accepted {case:?}"
        );
    }
}

#[test]
fn missing_files_report_their_path() {
    let dir = tempfile::tempdir().expect("tempdir");
    let missing = dir.path().join("nope.json");

    let err = Corpus::load(&missing, Box::new(bytes)).err().expect("missing snapshot");
    assert!(matches!(&err, SimdexError::Io { path, .. } if path == &missing));

    let present = dir.path().join("present.js");
    std::fs::write(&present, "let x = 1;").expect("write");
    let err = compare_files(&present, &missing, &SimdexConfig::default()).expect_err("missing");
    assert!(err.to_string().contains("nope.json"));
}

#[test]
fn config_errors_convert_into_simdex_errors() {
    let err: SimdexError = SimdexConfig::from_yaml_str("version: \"9\"\n")
        .expect_err("bad version")
        .into();
    assert!(matches!(err, SimdexError::Config(_)));
}
