//! Property tests for [`ArtifactName`] validation.
//!
//! Every accepted name must be safe to join onto the uploads directory:
//! one path component, not hidden, ending in `.zip`.

use depot_core::{ArtifactName, ValidationError, ARTIFACT_EXTENSION, MAX_NAME_LEN};
use proptest::prelude::*;

proptest! {
    #[test]
    fn accepted_names_are_single_visible_zip_components(s in "\\PC{0,300}") {
        if let Ok(name) = ArtifactName::new(s.clone()) {
            prop_assert!(name.as_str().ends_with(ARTIFACT_EXTENSION));
            prop_assert!(!name.as_str().contains('/'));
            prop_assert!(!name.as_str().contains('\\'));
            prop_assert!(!name.as_str().starts_with('.'));
            prop_assert!(name.as_str().len() <= MAX_NAME_LEN);
            prop_assert!(!name.stem().is_empty());
        }
    }

    #[test]
    fn simple_stems_with_zip_are_accepted(stem in "[A-Za-z0-9][A-Za-z0-9 _-]{0,60}") {
        let raw = format!("{stem}.zip");
        let name = ArtifactName::new(raw.clone()).unwrap();
        prop_assert_eq!(name.as_str(), raw.as_str());
        prop_assert_eq!(name.stem(), stem.as_str());
    }

    #[test]
    fn non_zip_suffixes_are_rejected(stem in "[a-z0-9]{1,20}", ext in "(txt|exe|tar|gz|7z|rar)") {
        let raw = format!("{stem}.{ext}");
        prop_assert_eq!(
            ArtifactName::new(raw.clone()),
            Err(ValidationError::WrongExtension(raw))
        );
    }

    #[test]
    fn parent_traversal_is_rejected(stem in "[a-z0-9]{1,20}") {
        let raw = format!("../{stem}.zip");
        prop_assert!(ArtifactName::new(raw).is_err());
    }
}
