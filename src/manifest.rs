//! The document set a game-mode archive is expected to contain.

use std::collections::BTreeSet;

use thiserror::Error;

/// Segment names, without extension, that a complete archive carries.
pub const REQUIRED_DOCUMENTS: [&str; 28] = [
    "abilitymanagermulti",
    "communityinfo",
    "custommanagermulti",
    "gamemodemanagermulti",
    "gamemodeparams_advteamwanted",
    "gamemodeparams_advwanted",
    "gamemodeparams_assassinate",
    "gamemodeparams_catsmice",
    "gamemodeparams_free",
    "gamemodeparams_pacman",
    "gamemodeparams_teamvip",
    "gamemodeparams_teamwanted",
    "gamemodeparams_vip",
    "gamemodeparams_wanted_2",
    "gamemode_advteamwanted",
    "gamemode_advwanted",
    "gamemode_assassinate",
    "gamemode_catsmice",
    "gamemode_free",
    "gamemode_pacman",
    "gamemode_teamvip",
    "gamemode_teamwanted",
    "gamemode_vip",
    "gamemode_wanted_2",
    "globalparams",
    "levelxpmanager",
    "mapmanagermulti",
    "scorebonusmanager",
];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("document set differs from the required set (missing: {missing:?}, unexpected: {unexpected:?})")]
pub struct ManifestError {
    pub missing:    Vec<String>,
    pub unexpected: Vec<String>,
}

/// Check that `names` is exactly [`REQUIRED_DOCUMENTS`], in any order.
pub fn validate_document_set<'a, I>(names: I) -> Result<(), ManifestError>
where
    I: IntoIterator<Item = &'a str>,
{
    let given: BTreeSet<&str> = names.into_iter().collect();
    let required: BTreeSet<&str> = REQUIRED_DOCUMENTS.iter().copied().collect();

    let missing: Vec<String> = required.difference(&given).map(|s| s.to_string()).collect();
    let unexpected: Vec<String> = given.difference(&required).map(|s| s.to_string()).collect();
    if missing.is_empty() && unexpected.is_empty() {
        Ok(())
    } else {
        Err(ManifestError { missing, unexpected })
    }
}
