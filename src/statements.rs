//! SQL text for each planned operation.
//!
//! Every statement here is safe to re-run against a server where it has
//! already been applied. Nothing in this module produces DROP, DELETE or
//! REVOKE.

use crate::config::Secret;
use crate::model::{OperationKind, PlannedOperation};
use crate::postgres::{quote_ident, quote_literal};

/// Stand-in for passwords in rendered plans and logs.
pub const MASKED_PASSWORD: &str = "*****";

/// How the password literal is rendered.
#[derive(Debug, Clone, Copy)]
pub enum PasswordText<'a> {
    /// The real value, for execution.
    Reveal(&'a Secret),
    /// `*****`, for plans and logs.
    Masked,
}

/// Statements that carry out `op`, in order.
#[must_use]
pub fn statements(op: &PlannedOperation, password: PasswordText<'_>) -> Vec<String> {
    let name = quote_ident(&op.target);
    match op.kind {
        OperationKind::CreateRole => vec![format!("CREATE ROLE {name} LOGIN")],
        OperationKind::AlterRolePassword => {
            let literal = match password {
                PasswordText::Reveal(secret) => quote_literal(secret.expose()),
                PasswordText::Masked => MASKED_PASSWORD.to_string(),
            };
            vec![format!("ALTER ROLE {name} WITH LOGIN PASSWORD {literal}")]
        }
        OperationKind::CreateDatabase => vec![format!("CREATE DATABASE {name} OWNER {name}")],
        OperationKind::ReassignOwnership => vec![format!("ALTER DATABASE {name} OWNER TO {name}")],
        OperationKind::GrantSchemaPrivileges => vec![
            format!("ALTER SCHEMA public OWNER TO {name}"),
            format!("GRANT ALL PRIVILEGES ON SCHEMA public TO {name}"),
            format!("GRANT ALL PRIVILEGES ON ALL TABLES IN SCHEMA public TO {name}"),
            format!("GRANT ALL PRIVILEGES ON ALL SEQUENCES IN SCHEMA public TO {name}"),
            format!("GRANT ALL PRIVILEGES ON ALL FUNCTIONS IN SCHEMA public TO {name}"),
        ],
    }
}
