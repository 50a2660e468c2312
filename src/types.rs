/// Opaque content identifier addressing an immutable object in the store.
/// Example: `QmSdDg6V9dgpdAFtActs75Qfc36qJtm9y8a7yrQ1rHm7ZX`
pub type ContentHash = String;
/// Logical dataset name, as exposed by the root mapping.
/// Examples: `ArXiv`, `Books3`, `OpenWebText2`
pub type DatasetName = String;
/// Name of the record attribute carrying sample text.
/// Examples: `Text`, `text`, `content`
pub type TextFieldName = String;
/// A single token id produced by a tokenizer.
pub type TokenId = u32;
