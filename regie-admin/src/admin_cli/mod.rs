pub mod audit_commands;
pub mod migrate_commands;
pub mod org_commands;
pub mod patch_commands;
pub mod profile_commands;
pub mod sql_commands;
pub mod system_commands;
pub mod utils;
