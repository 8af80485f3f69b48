//! Sacamantecas - library catalogue metadata skimmer
//!
//! Given addresses of catalogue record pages, picks the vendor profile whose
//! URL pattern matches, fetches and decodes the page and extracts its
//! key/value metadata with one of two streaming recognition strategies.
//! Addresses come from the command line, text files or Excel workbooks and
//! results are written next to each source.

pub mod application;
pub mod domain;
pub mod infrastructure;
