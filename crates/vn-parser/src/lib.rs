mod line;
mod script;

pub use line::{is_builtin_keyword, is_identifier, parse_line, tokenize, LineItem, BUILTIN_KEYWORDS};
pub use script::{parse_script, ParsedScript};
