//! Category classification and stable item naming.
//!
//! Both functions are pure: they only look at path segments, never at the
//! filesystem, so the same path always yields the same `(category, name)`.

use crate::domain::Category;
use crate::utils::normalize_path;

/// Classify a base-relative path by its directory segments.
///
/// Categories are tried in `Category::KNOWN` order; the first whose token
/// appears as a directory segment wins. The file name itself never counts.
pub fn classify_path(rel_path: &str) -> Category {
    let normalized = normalize_path(rel_path);
    let mut segments: Vec<&str> = normalized.split('/').filter(|s| !s.is_empty()).collect();
    // Drop the file name.
    segments.pop();

    Category::KNOWN
        .iter()
        .copied()
        .find(|category| segments.iter().any(|segment| *segment == category.as_str()))
        .unwrap_or(Category::Unknown)
}

/// Derive the registry name for a base-relative path.
///
/// The content-root prefix and the final extension are stripped and the
/// remaining separators become underscores:
/// `.ai-ley/shared/personas/dev/engineer.md` -> `personas_dev_engineer`.
pub fn item_name(rel_path: &str, content_prefix: &str) -> String {
    let normalized = normalize_path(rel_path);
    let prefix = content_prefix.trim_matches('/');

    let mut stripped = normalized.as_str();
    if !prefix.is_empty() {
        if let Some(rest) = stripped.strip_prefix(prefix) {
            if let Some(rest) = rest.strip_prefix('/') {
                stripped = rest;
            }
        }
    }
    let stripped = stripped.trim_start_matches('/');

    let without_ext = match stripped.rfind('.') {
        Some(dot) if dot > stripped.rfind('/').map_or(0, |slash| slash + 1) => &stripped[..dot],
        _ => stripped,
    };

    without_ext.split('/').filter(|s| !s.is_empty()).collect::<Vec<_>>().join("_")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PREFIX: &str = ".ai-ley/shared";

    #[test]
    fn test_classify_every_category_token() {
        let cases = [
            (".ai-ley/shared/personas/engineer.md", Category::Personas),
            (".ai-ley/shared/instructions/foo.md", Category::Instructions),
            (".ai-ley/shared/workflows/release.md", Category::Workflows),
            (".ai-ley/shared/schemas/persona.schema.json", Category::Schemas),
            (".ai-ley/shared/prompts/review.md", Category::Prompts),
            (".ai-ley/shared/policies/security.md", Category::Policies),
            ("a/b/instructions/foo.md", Category::Instructions),
            (".ai-ley/shared/docs/guide.md", Category::Unknown),
            ("personas.md", Category::Unknown),
            (".ai-ley/shared/Personas/engineer.md", Category::Unknown),
        ];
        for (path, expected) in cases {
            assert_eq!(classify_path(path), expected, "path: {path}");
        }
    }

    #[test]
    fn test_classify_uses_priority_order() {
        // prompts appears first in the path, but personas has higher priority
        assert_eq!(classify_path("shared/prompts/personas/x.md"), Category::Personas);
        assert_eq!(classify_path("shared/policies/workflows/x.md"), Category::Workflows);
    }

    #[test]
    fn test_classify_ignores_file_name() {
        assert_eq!(classify_path("shared/docs/personas"), Category::Unknown);
    }

    #[test]
    fn test_classify_accepts_backslashes() {
        assert_eq!(classify_path(r".ai-ley\shared\prompts\a.md"), Category::Prompts);
    }

    #[test]
    fn test_item_name_strips_prefix_and_extension() {
        let cases = [
            (".ai-ley/shared/personas/dev/engineer.md", "personas_dev_engineer"),
            (".ai-ley/shared/instructions/foo.md", "instructions_foo"),
            (".ai-ley/shared/schemas/persona.schema.json", "schemas_persona.schema"),
            (".ai-ley/shared/workflows/deploy.yaml", "workflows_deploy"),
            (".ai-ley/shared/prompts/no-extension", "prompts_no-extension"),
            ("elsewhere/personas/a.md", "elsewhere_personas_a"),
        ];
        for (path, expected) in cases {
            assert_eq!(item_name(path, PREFIX), expected, "path: {path}");
        }
    }

    #[test]
    fn test_item_name_does_not_strip_partial_prefix() {
        assert_eq!(item_name(".ai-ley/shared-extra/personas/a.md", PREFIX), ".ai-ley_shared-extra_personas_a");
    }

    #[test]
    fn test_item_name_with_empty_prefix() {
        assert_eq!(item_name("personas/a.md", ""), "personas_a");
    }
}
