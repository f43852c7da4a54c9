// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Gatehouse Authors

//! # app-utils
//!
//! Policy document parsing and loading for `core-logic`.
//!
//! - YAML, TOML and JSON parsers behind one [`PolicyParser`] trait
//! - Format detection from file extensions
//! - Loading documents from disk into a [`Policy`](core_logic::Policy)

#![forbid(unsafe_code)]

pub mod error;

pub mod parser {
    //! Policy document parsers
    //!
    //! Every parser goes through `PolicyDocument`'s validating
    //! deserializer, so documents with an empty or overlong name never come
    //! back `Ok`. Rule counts are checked when the rules load.

    use crate::error::{Error, Result};
    use core_logic::PolicyDocument;
    use std::path::Path;

    /// Trait for policy parsers
    pub trait PolicyParser {
        /// Parse a policy document from a string
        fn parse(&self, input: &str) -> Result<PolicyDocument>;

        /// Serialize a policy document
        fn render(&self, document: &PolicyDocument) -> Result<String>;
    }

    /// YAML parser
    #[derive(Debug, Clone, Copy, Default)]
    pub struct YamlParser;

    impl PolicyParser for YamlParser {
        fn parse(&self, input: &str) -> Result<PolicyDocument> {
            serde_yaml::from_str(input).map_err(|e| Error::Parse {
                format: "YAML",
                message: e.to_string(),
            })
        }

        fn render(&self, document: &PolicyDocument) -> Result<String> {
            serde_yaml::to_string(document).map_err(|e| Error::Serialize {
                format: "YAML",
                message: e.to_string(),
            })
        }
    }

    /// TOML parser
    #[derive(Debug, Clone, Copy, Default)]
    pub struct TomlParser;

    impl PolicyParser for TomlParser {
        fn parse(&self, input: &str) -> Result<PolicyDocument> {
            toml::from_str(input).map_err(|e| Error::Parse {
                format: "TOML",
                message: e.to_string(),
            })
        }

        fn render(&self, document: &PolicyDocument) -> Result<String> {
            toml::to_string(document).map_err(|e| Error::Serialize {
                format: "TOML",
                message: e.to_string(),
            })
        }
    }

    /// JSON parser
    #[derive(Debug, Clone, Copy, Default)]
    pub struct JsonParser;

    impl PolicyParser for JsonParser {
        fn parse(&self, input: &str) -> Result<PolicyDocument> {
            serde_json::from_str(input).map_err(|e| Error::Parse {
                format: "JSON",
                message: e.to_string(),
            })
        }

        fn render(&self, document: &PolicyDocument) -> Result<String> {
            serde_json::to_string_pretty(document).map_err(|e| Error::Serialize {
                format: "JSON",
                message: e.to_string(),
            })
        }
    }

    /// Supported document formats
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Format {
        /// `.yaml` / `.yml`
        Yaml,
        /// `.toml`
        Toml,
        /// `.json`
        Json,
    }

    impl Format {
        /// Detect the format from a file extension (case-insensitive)
        ///
        /// # Errors
        ///
        /// Returns `Error::UnsupportedFormat` for unknown or missing extensions
        pub fn from_path(path: &Path) -> Result<Self> {
            let ext = path
                .extension()
                .and_then(|e| e.to_str())
                .map(str::to_ascii_lowercase)
                .unwrap_or_default();
            match ext.as_str() {
                "yaml" | "yml" => Ok(Self::Yaml),
                "toml" => Ok(Self::Toml),
                "json" => Ok(Self::Json),
                _ => Err(Error::UnsupportedFormat(ext)),
            }
        }

        /// Parser for this format
        #[must_use]
        pub fn parser(self) -> &'static dyn PolicyParser {
            match self {
                Self::Yaml => &YamlParser,
                Self::Toml => &TomlParser,
                Self::Json => &JsonParser,
            }
        }
    }
}

pub mod loader {
    //! Loading policy documents from disk

    use crate::error::{Error, Result};
    use crate::parser::Format;
    use core_logic::{
        EngineConfig, HostError, LoadReport, Policy, PolicyDocument, TypeDescriptor,
        TypeRegistry,
    };
    use std::fs;
    use std::path::Path;
    use tracing::debug;

    /// Read and parse a policy document, picking the parser by extension
    ///
    /// # Errors
    ///
    /// - `UnsupportedFormat` for unknown extensions
    /// - `Io` if the file cannot be read
    /// - `Parse` for malformed documents or invalid document names
    pub fn load_path(path: impl AsRef<Path>) -> Result<PolicyDocument> {
        let path = path.as_ref();
        let format = Format::from_path(path)?;
        let content = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let document = format.parser().parse(&content)?;
        debug!(
            path = %path.display(),
            policy = document.name(),
            rules = document.rules().len(),
            "policy document parsed"
        );
        Ok(document)
    }

    /// Registry for checking a document without its host
    ///
    /// Declares the document's types and gives each one a constructor that
    /// always fails, so `Construct` goals pass load-time checks. Queries
    /// that reach such a constructor simply fail the goal.
    ///
    /// # Errors
    ///
    /// Returns the `PolicyError` raised by an invalid type declaration
    pub fn offline_registry(document: &PolicyDocument) -> Result<TypeRegistry> {
        let mut registry = document.registry()?;
        for decl in document.types() {
            let type_name = decl.name.clone();
            let descriptor =
                TypeDescriptor::from(decl.clone()).constructor(move |_args| {
                    Err(HostError::Failed(format!("no host constructor for `{}`", type_name)))
                });
            registry.register(descriptor);
        }
        Ok(registry)
    }

    /// Parse a document and load it into a new [`Policy`] over its offline registry
    ///
    /// # Errors
    ///
    /// Any error from [`load_path`] or [`offline_registry`], an invalid
    /// `config`, or a rejected load (including more than `config.max_rules`
    /// rules)
    pub fn load_policy(path: impl AsRef<Path>, config: EngineConfig) -> Result<(Policy, LoadReport)> {
        let document = load_path(path)?;
        let registry = offline_registry(&document)?;
        Ok(Policy::from_document(document, registry, config)?)
    }
}

pub use error::{Error, Result};
pub use loader::{load_path, load_policy, offline_registry};
pub use parser::{Format, JsonParser, PolicyParser, TomlParser, YamlParser};
