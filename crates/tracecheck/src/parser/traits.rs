pub use super::model::{LogLine, ParseError, SourceId};

pub trait LineParser: Send + Sync {
    /// cheap relevance check, run on every line of the file
    fn matches(&self, raw: &str) -> bool;

    /// parse one relevant line into structured data
    fn parse(&self, raw: &str, source: &SourceId, line_no: usize) -> Result<LogLine, ParseError>;
}
