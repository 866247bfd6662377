use super::*;
use crate::word::Word;

fn trained_model() -> AlignModel {
    let corpus = records(&[
        ("C A T", "K AE T"),
        ("C A B", "K AE B"),
        ("K N O T", "N AA T"),
        ("B O A T", "B OW T"),
        ("T O", "T OW"),
    ]);
    AlignTrainer::new(TrainOptions::default())
        .unwrap()
        .train(&corpus)
        .unwrap()
}

fn summary(alignments: &[Alignment]) -> Vec<(String, f64)> {
    alignments.iter().map(|a| (a.to_string(), a.score())).collect()
}

#[test]
fn test_roundtrip_preserves_searches() {
    let model = trained_model();
    let bytes = model.to_bytes().unwrap();
    let loaded = AlignModel::from_bytes(&bytes).unwrap();

    assert_eq!(loaded.gram_options(), model.gram_options());
    assert_eq!(loaded.transitions().floor(), model.transitions().floor());
    assert_eq!(
        loaded.transitions().sorted_entries(),
        model.transitions().sorted_entries()
    );

    let x = Word::from_space_string("K N O T");
    let y = Word::from_space_string("N AA T");
    assert_eq!(summary(&loaded.align(&x, &y, 5)), summary(&model.align(&x, &y, 5)));

    let unseen = Word::from_space_string("B A T");
    assert_eq!(
        summary(&loaded.infer_alignments(&unseen, 5)),
        summary(&model.infer_alignments(&unseen, 5))
    );
}

#[test]
fn test_bytes_are_deterministic() {
    let model = trained_model();
    let bytes = model.to_bytes().unwrap();
    assert_eq!(bytes, model.to_bytes().unwrap());
    assert_eq!(&bytes[0..4], b"G2PA");
    assert_eq!(bytes[4], 1);

    let reloaded = AlignModel::from_bytes(&bytes).unwrap();
    assert_eq!(reloaded.to_bytes().unwrap(), bytes);
}

#[test]
fn test_penalizer_follows_loaded_options() {
    let opts = GramOptions::new(1, 1, 1, 1)
        .unwrap()
        .with_x_epsilons(true)
        .with_city_block_penalty(true);
    let model = AlignModel::new(opts, ProbTable::new());
    let loaded = AlignModel::from_bytes(&model.to_bytes().unwrap()).unwrap();
    assert!(loaded.gram_options().city_block_penalty());

    let x = Word::from_space_string("A B C");
    let y = Word::from_space_string("P");
    let best = &loaded.align(&x, &y, 1)[0];
    assert_eq!(best.y_as_pipe_string(), "|P|");
}

#[test]
fn test_save_and_open() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("models").join("cmudict.g2pa");
    let model = trained_model();
    model.save(&path).unwrap();

    assert!(path.exists());
    assert!(!path.with_extension("tmp").exists());

    let loaded = AlignModel::open(&path).unwrap();
    assert_eq!(loaded.to_bytes().unwrap(), model.to_bytes().unwrap());
}

#[test]
fn test_open_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = AlignModel::open(&dir.path().join("missing.g2pa")).unwrap_err();
    assert!(matches!(err, ModelError::Io(_)));
}

#[test]
fn test_rejects_short_input() {
    let bytes = trained_model().to_bytes().unwrap();
    assert!(matches!(
        AlignModel::from_bytes(&bytes[..5]),
        Err(ModelError::InvalidHeader)
    ));
    assert!(matches!(
        AlignModel::from_bytes(&[]),
        Err(ModelError::InvalidHeader)
    ));
}

#[test]
fn test_rejects_bad_magic() {
    let mut bytes = trained_model().to_bytes().unwrap();
    bytes[0] = b'X';
    assert!(matches!(
        AlignModel::from_bytes(&bytes),
        Err(ModelError::InvalidMagic)
    ));
}

#[test]
fn test_rejects_unknown_version() {
    let mut bytes = trained_model().to_bytes().unwrap();
    bytes[4] = 9;
    assert!(matches!(
        AlignModel::from_bytes(&bytes),
        Err(ModelError::UnsupportedVersion(9))
    ));
}

#[test]
fn test_rejects_corrupt_body() {
    let mut bytes = trained_model().to_bytes().unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xFF;
    assert!(matches!(
        AlignModel::from_bytes(&bytes),
        Err(ModelError::ChecksumMismatch)
    ));
}

#[test]
fn test_rejects_truncated_body_with_valid_checksum() {
    let bytes = trained_model().to_bytes().unwrap();
    let body = &bytes[9..bytes.len() - 4];
    let mut forged = bytes[..5].to_vec();
    forged.extend_from_slice(&crc32fast::hash(body).to_le_bytes());
    forged.extend_from_slice(body);
    assert!(matches!(
        AlignModel::from_bytes(&forged),
        Err(ModelError::Deserialize(_))
    ));
}
