//! Concrete handlers for the screens of the default wizard plan.

mod account;
mod choice;
mod entries;
mod location;
mod profile;
mod resume;
mod simple;
mod submit;

use std::sync::Arc;

pub use account::AccountHandler;
pub use choice::{ChoiceHandler, PreferenceHandler};
pub use entries::{EntryKind, EntriesHandler};
pub use location::LocationHandler;
pub use profile::{ChipsHandler, LanguagesHandler, TextFieldHandler};
pub use resume::ResumeImportHandler;
pub use simple::SimpleAdvanceHandler;
pub use submit::SubmitHandler;

use crate::handler::StepHandler;

/// Handler for a step of the default plan, by name. Unknown names get the
/// simple-advance handler.
pub fn default_handler(name: &str) -> Arc<dyn StepHandler> {
    match name {
        "account" => Arc::new(AccountHandler),
        "experience" => Arc::new(ChoiceHandler::new("experience", |p| p.experience_level.as_str())),
        "goal" => Arc::new(ChoiceHandler::new("goal", |p| p.goal.as_str())),
        "work_preference" => Arc::new(PreferenceHandler),
        "resume_import" => Arc::new(ResumeImportHandler),
        "title" => Arc::new(TextFieldHandler::new("title", "title.input", |p| p.title.as_str())),
        "employment" => Arc::new(EntriesHandler::new(EntryKind::Employment)),
        "education" => Arc::new(EntriesHandler::new(EntryKind::Education)),
        "languages" => Arc::new(LanguagesHandler),
        "skills" => Arc::new(ChipsHandler::new("skills", "skills.input", |p| p.skills.as_slice())),
        "categories" => Arc::new(ChipsHandler::new(
            "categories",
            "categories.input",
            |p| p.categories.as_slice(),
        )),
        "overview" => Arc::new(TextFieldHandler::new(
            "overview",
            "overview.textarea",
            |p| p.overview.as_str(),
        )),
        "rate" => Arc::new(TextFieldHandler::new("rate", "rate.hourly", |p| p.hourly_rate.as_str())),
        "location" => Arc::new(LocationHandler),
        "submit" => Arc::new(SubmitHandler),
        other => Arc::new(SimpleAdvanceHandler::new(other)),
    }
}
