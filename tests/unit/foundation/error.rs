use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        StageError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(
        StageError::asset_resolution("x")
            .to_string()
            .contains("asset resolution error:")
    );
    assert!(
        StageError::asset_load("x")
            .to_string()
            .contains("asset load error:")
    );
    assert!(
        StageError::render_backend("x")
            .to_string()
            .contains("render backend error:")
    );
    assert!(
        StageError::serde("x")
            .to_string()
            .contains("serialization error:")
    );
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = StageError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
