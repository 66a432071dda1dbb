// key layout constants
pub const KEY_SEPARATOR: char = ':';
pub const ESCAPE_CHAR: char = '\\';
pub const DOC_SEGMENT: &str = "doc";
pub const INDEX_SEGMENT: &str = "idx";

// canonical value tags used in index keys and document ids
pub const STRING_TAG: &str = "s";
pub const NUMBER_TAG: &str = "n";
pub const BOOL_TAG: &str = "b";

// structured record field tags
pub const RECORD_STRING_TAG: &str = "s";
pub const RECORD_INTEGER_TAG: &str = "i";
pub const RECORD_FLOAT_TAG: &str = "f";
pub const RECORD_BOOL_TAG: &str = "b";

// filter constants
pub const OPERATOR_PREFIX: char = '$';
pub const OP_EQ: &str = "$eq";
pub const OP_NE: &str = "$ne";
pub const OP_IN: &str = "$in";
pub const OP_NIN: &str = "$nin";
pub const OP_GT: &str = "$gt";
pub const OP_GTE: &str = "$gte";
pub const OP_LT: &str = "$lt";
pub const OP_LTE: &str = "$lte";
pub const OP_REGEX: &str = "$regex";
pub const OP_OPTIONS: &str = "$options";
