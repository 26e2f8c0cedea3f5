use super::*;
use crate::document::segment::{RawSegment, resolve};

#[test]
fn display_prefixes_are_stable() {
    let schema = resolve(&RawSegment::default(), &RawSegment::default()).unwrap_err();
    assert!(
        FlipreelError::from(schema)
            .to_string()
            .contains("schema error:")
    );
    assert!(
        FlipreelError::reference("x")
            .to_string()
            .contains("reference error:")
    );
    assert!(
        FlipreelError::asset_load("frames/a01.png", "x")
            .to_string()
            .contains("asset load error: 'frames/a01.png'")
    );
    assert!(
        FlipreelError::document_parse("x")
            .to_string()
            .contains("document parse error:")
    );
    assert!(
        FlipreelError::validation("x")
            .to_string()
            .contains("validation error:")
    );
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = FlipreelError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
