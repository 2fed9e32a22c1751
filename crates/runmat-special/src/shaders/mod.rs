pub mod special;

pub use special::SPECIAL_SHADER_TEMPLATE;

use crate::types::ProgramKey;

/// Render the special-function program for one type pair.
pub fn render(key: &ProgramKey, workgroup_size: u32) -> String {
    SPECIAL_SHADER_TEMPLATE
        .replace("@IN@", key.input.type_name())
        .replace("@OUT@", key.output.type_name())
        .replace("@WG@", &workgroup_size.to_string())
}

/// Names of the `@compute` entry points declared in `source`.
pub fn entry_points(source: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut pending = false;
    for line in source.lines() {
        let line = line.trim();
        if line.starts_with("@compute") {
            pending = true;
            // Attribute and signature may share a line.
            if let Some(name) = fn_name(line) {
                names.push(name);
                pending = false;
            }
            continue;
        }
        if pending {
            if let Some(name) = fn_name(line) {
                names.push(name);
                pending = false;
            }
        }
    }
    names
}

fn fn_name(line: &str) -> Option<String> {
    let (_, rest) = line.split_once("fn ")?;
    let name: String = rest
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    (!name.is_empty()).then_some(name)
}

/// First `@NAME@` placeholder left in `source`, if any.
pub fn unresolved_placeholder(source: &str) -> Option<&str> {
    let mut rest = source;
    while let Some(start) = rest.find('@') {
        let tail = &rest[start + 1..];
        let len = tail
            .chars()
            .take_while(|c| c.is_ascii_uppercase() || *c == '_')
            .count();
        if len > 0 && tail[len..].starts_with('@') {
            return Some(&rest[start..start + len + 2]);
        }
        rest = tail;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::KernelFunction;
    use runmat_special_api::ScalarType;

    #[test]
    fn render_substitutes_every_placeholder() {
        let key = ProgramKey::new(ScalarType::I32, ScalarType::F32).expect("key");
        let src = render(&key, 128);
        assert!(src.contains("data: array<i32>"));
        assert!(src.contains("data: array<f32>"));
        assert!(src.contains("@workgroup_size(128)"));
        assert_eq!(unresolved_placeholder(&src), None);
    }

    #[test]
    fn template_declares_all_kernel_functions() {
        let key = ProgramKey::new(ScalarType::F32, ScalarType::F32).expect("key");
        let names = entry_points(&render(&key, 64));
        let expected: Vec<String> = KernelFunction::ALL
            .iter()
            .map(|f| f.name().to_string())
            .collect();
        assert_eq!(names, expected);
    }

    #[test]
    fn helpers_are_not_entry_points() {
        let src = "fn helper() {}\n@compute @workgroup_size(1)\nfn main() {}\n";
        assert_eq!(entry_points(src), vec!["main".to_string()]);
    }

    #[test]
    fn placeholder_scan_ignores_attributes() {
        assert_eq!(unresolved_placeholder("@group(0) @binding(1)"), None);
        assert_eq!(
            unresolved_placeholder("array<@IN@>"),
            Some("@IN@")
        );
        assert_eq!(unresolved_placeholder(SPECIAL_SHADER_TEMPLATE), Some("@IN@"));
    }
}
