//! TypeScript type generation.
//!
//! Exports every struct annotated with `#[ts(export)]` when the test suite
//! runs, so the front end can pick up the request and response shapes.

#[cfg(test)]
mod tests {
    use std::{env, path::Path};

    use ts_rs::TS;

    #[test]
    fn generate_typescript_types() {
        // REGIE_TS_OUTPUT_DIR wins, otherwise ../ts-bindings
        let output_dir_str = match env::var("REGIE_TS_OUTPUT_DIR") {
            Ok(env_dir) => {
                println!("Using TypeScript output directory from REGIE_TS_OUTPUT_DIR: {}", env_dir);
                env_dir
            }
            Err(_) => "../ts-bindings".to_string(),
        };

        let output_dir = Path::new(&output_dir_str);
        if !output_dir.exists() {
            std::fs::create_dir_all(output_dir).expect("Failed to create output directory");
        }

        // Remove stale .ts files so renamed types do not linger
        println!("Cleaning old TypeScript files from {:?}", output_dir);
        for entry in std::fs::read_dir(output_dir).expect("Failed to read output directory") {
            let entry = entry.expect("Failed to read directory entry");
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) == Some("ts") {
                std::fs::remove_file(&path)
                    .unwrap_or_else(|e| panic!("Failed to remove {:?}: {}", path, e));
            }
        }

        unsafe {
            env::set_var("TS_RS_EXPORT_DIR", output_dir);
        }

        use crate::{
            api::{
                health::HealthStatus,
                login::{LoginRequest, LoginSuccessResponse},
                notification::{MarkAllReadResponse, NotificationList},
            },
            billing::FactureAmounts,
            config::PublicConfig,
            error::ErrorResponse,
            models::*,
            pagination::PageInfo,
            workflow::{AbonnementStatus, FactureStatus, MissionStatus, Priorite, TicketStatus},
        };

        // Organisations and people
        Role::export().expect("Failed to export Role type");
        ProfileInfo::export().expect("Failed to export ProfileInfo type");
        Regie::export().expect("Failed to export Regie type");
        Entreprise::export().expect("Failed to export Entreprise type");
        Technicien::export().expect("Failed to export Technicien type");

        // Workflow
        TicketStatus::export().expect("Failed to export TicketStatus type");
        MissionStatus::export().expect("Failed to export MissionStatus type");
        FactureStatus::export().expect("Failed to export FactureStatus type");
        AbonnementStatus::export().expect("Failed to export AbonnementStatus type");
        Priorite::export().expect("Failed to export Priorite type");

        Ticket::export().expect("Failed to export Ticket type");
        TicketInput::export().expect("Failed to export TicketInput type");
        AssignTicketInput::export().expect("Failed to export AssignTicketInput type");
        Mission::export().expect("Failed to export Mission type");
        AssignTechnicienInput::export().expect("Failed to export AssignTechnicienInput type");
        TerminerMissionInput::export().expect("Failed to export TerminerMissionInput type");

        // Billing
        Facture::export().expect("Failed to export Facture type");
        FactureInput::export().expect("Failed to export FactureInput type");
        FactureAmounts::export().expect("Failed to export FactureAmounts type");

        // Conversation and inbox
        Message::export().expect("Failed to export Message type");
        MessageInput::export().expect("Failed to export MessageInput type");
        Notification::export().expect("Failed to export Notification type");
        NotificationList::export().expect("Failed to export NotificationList type");
        MarkAllReadResponse::export().expect("Failed to export MarkAllReadResponse type");

        // Subscriptions
        Plan::export().expect("Failed to export Plan type");
        Abonnement::export().expect("Failed to export Abonnement type");
        AbonnementInput::export().expect("Failed to export AbonnementInput type");
        UpgradeInput::export().expect("Failed to export UpgradeInput type");
        AdminStats::export().expect("Failed to export AdminStats type");

        // Envelopes and plumbing
        LoginRequest::export().expect("Failed to export LoginRequest type");
        LoginSuccessResponse::export().expect("Failed to export LoginSuccessResponse type");
        HealthStatus::export().expect("Failed to export HealthStatus type");
        PublicConfig::export().expect("Failed to export PublicConfig type");
        ErrorResponse::export().expect("Failed to export ErrorResponse type");
        PageInfo::export().expect("Failed to export PageInfo type");

        println!("TypeScript types generated successfully in {:?}", output_dir);
    }
}
