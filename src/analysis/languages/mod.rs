//! Language adapter implementations.

mod javascript;
mod python;
mod terraform;

pub use javascript::JavaScriptAdapter;
pub use python::PythonAdapter;
pub use terraform::TerraformAdapter;

use once_cell::sync::OnceCell;

use super::LanguageAdapter;
use crate::language::Language;

/// Static storage for the Terraform adapter.
static TERRAFORM_ADAPTER: OnceCell<TerraformAdapter> = OnceCell::new();

/// Static storage for the JavaScript adapter.
static JAVASCRIPT_ADAPTER: OnceCell<JavaScriptAdapter> = OnceCell::new();

/// Static storage for the Python adapter.
static PYTHON_ADAPTER: OnceCell<PythonAdapter> = OnceCell::new();

/// Get the adapter for a language, building it on first use.
///
/// Construction only fails if a bundled tree-sitter query does not compile
/// against its grammar.
pub fn adapter_for(language: Language) -> anyhow::Result<&'static dyn LanguageAdapter> {
    let adapter: &'static dyn LanguageAdapter = match language {
        Language::Terraform => TERRAFORM_ADAPTER.get_or_init(TerraformAdapter::new),
        Language::JavaScript => JAVASCRIPT_ADAPTER.get_or_try_init(JavaScriptAdapter::new)?,
        Language::Python => PYTHON_ADAPTER.get_or_try_init(PythonAdapter::new)?,
    };
    Ok(adapter)
}

/// Build every adapter up front so query errors surface before any file is read.
pub fn register_adapters() -> anyhow::Result<()> {
    for language in Language::ALL {
        adapter_for(language)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_language_has_an_adapter() {
        register_adapters().unwrap();
        for language in Language::ALL {
            let adapter = adapter_for(language).unwrap();
            assert_eq!(adapter.language(), language);
            for ext in language.extensions() {
                assert!(adapter.handles_extension(ext));
            }
        }
    }

    #[test]
    fn test_adapter_is_shared() {
        let a = adapter_for(Language::Python).unwrap() as *const dyn LanguageAdapter as *const ();
        let b = adapter_for(Language::Python).unwrap() as *const dyn LanguageAdapter as *const ();
        assert_eq!(a, b);
    }
}
