use tracing::{info, warn};

use crate::db::RosterStorage;
use crate::error::RosterError;

/// Create a section and return its trimmed name.
pub async fn create_section(storage: &RosterStorage, name: &str) -> Result<String, RosterError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(RosterError::Validation(
            "Section name is required.".to_string(),
        ));
    }

    if !storage.add_section(name).await? {
        warn!(section_name = name, "rejected duplicate section name");
        return Err(RosterError::DuplicateSection(name.to_string()));
    }

    info!(section_name = name, "section created");
    Ok(name.to_string())
}
