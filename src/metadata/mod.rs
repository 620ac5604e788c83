//! Metadata handling: directives and the info-dictionary cleaner
//! Created: 2025-06-03 15:05:27 UTC
//! Author: kartik4091

pub mod directives;
pub mod info_cleaner;

pub use directives::{
    normalize_key, parse_pair, DirectiveSet, FieldDirective, MetadataAction, STANDARD_FIELDS,
};
pub use info_cleaner::{decode_text, discover_extra_keys, encode_text, read_info, InfoCleaner};
