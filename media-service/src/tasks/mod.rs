pub mod analysis;
pub mod book;
pub mod editor;
pub mod movie;
pub mod research;
pub mod tv;
pub mod types;
pub mod utils;

pub use analysis::AnalysisTask;
pub use book::BookSpecialistTask;
pub use editor::EditorTask;
pub use movie::MovieSpecialistTask;
pub use research::ResearchTask;
pub use tv::TvSpecialistTask;
pub use types::TaskInputs;
pub use utils::{CompletionAgent, OpenRouterAgent};
