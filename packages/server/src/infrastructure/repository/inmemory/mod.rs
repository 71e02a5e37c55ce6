//! InMemory Repository 実装
//!
//! すべてのデータはプロセス内の HashMap に保持され、再起動で失われます。

mod preset;
mod session;
mod stats;

pub use preset::InMemoryPresetRepository;
pub use session::InMemorySessionRepository;
pub use stats::InMemoryStatsRepository;
