pub mod json;

pub use json::{export_deck, export_json_to_path, import_deck, import_json};
