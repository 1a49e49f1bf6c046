// command.rs — Serializable operations and sequential batch submission.
//
// A `Command` names one mutating operation with its arguments. Batches are
// applied in order with no reordering or merging, so submitting a batch is
// indistinguishable from issuing the same commands one by one (same results,
// same journal, same head hash).

use serde::{Deserialize, Serialize};
use warden_policy::{Action, Member, Permission, Role};

use crate::error::AccessError;
use crate::system::{AccessControlSystem, Outcome};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Command {
    AddPolicy {
        caller: String,
        /// `None` targets the resource-table scope.
        #[serde(default)]
        scope_id: Option<u64>,
        role: Role,
        resource: String,
        action: Action,
        permission: Permission,
    },
    DeployScope {
        caller: String,
        subject: String,
        object: String,
        resource_kind: String,
    },
    ActivateScope {
        caller: String,
        scope_id: u64,
    },
    DeactivateScope {
        caller: String,
        scope_id: u64,
    },
    AccessControl {
        caller: String,
        scope_id: u64,
        resource: String,
        action: Action,
    },
    CreateAccessRequest {
        caller: String,
        resource: String,
        action: Action,
    },
    HandleAccessRequest {
        caller: String,
        id: u64,
        approve: bool,
    },
    RevokeAccessRequest {
        caller: String,
        id: u64,
    },
    ViewGlobalResourceTable {
        caller: String,
    },
    ViewLocalResourceTable {
        caller: String,
    },
    EditGlobalResourceTable {
        caller: String,
        old: String,
        new: String,
    },
    DeleteGlobalResourceTable {
        caller: String,
        target: String,
    },
    RevokeMember {
        caller: String,
        target: String,
    },
}

impl Command {
    pub fn caller(&self) -> &str {
        match self {
            Command::AddPolicy { caller, .. }
            | Command::DeployScope { caller, .. }
            | Command::ActivateScope { caller, .. }
            | Command::DeactivateScope { caller, .. }
            | Command::AccessControl { caller, .. }
            | Command::CreateAccessRequest { caller, .. }
            | Command::HandleAccessRequest { caller, .. }
            | Command::RevokeAccessRequest { caller, .. }
            | Command::ViewGlobalResourceTable { caller }
            | Command::ViewLocalResourceTable { caller }
            | Command::EditGlobalResourceTable { caller, .. }
            | Command::DeleteGlobalResourceTable { caller, .. }
            | Command::RevokeMember { caller, .. } => caller,
        }
    }

    pub fn operation(&self) -> &'static str {
        match self {
            Command::AddPolicy { .. } => "policy_add",
            Command::DeployScope { .. } => "deploy_scope",
            Command::ActivateScope { .. } => "activate_scope",
            Command::DeactivateScope { .. } => "deactivate_scope",
            Command::AccessControl { .. } => "access_control",
            Command::CreateAccessRequest { .. } => "create_access_request",
            Command::HandleAccessRequest { .. } => "handle_access_request",
            Command::RevokeAccessRequest { .. } => "revoke_access_request",
            Command::ViewGlobalResourceTable { .. } => "view_global_resource_table",
            Command::ViewLocalResourceTable { .. } => "view_local_resource_table",
            Command::EditGlobalResourceTable { .. } => "edit_global_resource_table",
            Command::DeleteGlobalResourceTable { .. } => "delete_global_resource_table",
            Command::RevokeMember { .. } => "revoke_member",
        }
    }
}

/// What a successfully executed command produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CommandOutput {
    Done,
    PolicyWritten { replaced: Option<Permission> },
    ScopeDeployed { scope_id: u64 },
    RequestCreated { id: u64 },
    Vote { approved: bool },
    Snapshot { members: Vec<Member> },
}

impl AccessControlSystem {
    /// Apply one command. Operations without a screening step always come
    /// back as `Outcome::Completed`.
    pub fn execute(&mut self, command: &Command) -> Result<Outcome<CommandOutput>, AccessError> {
        let done = |_: ()| CommandOutput::Done;
        match command {
            Command::AddPolicy {
                caller,
                scope_id,
                role,
                resource,
                action,
                permission,
            } => {
                let replaced =
                    self.add_policy(caller, *scope_id, *role, resource, action.clone(), *permission)?;
                Ok(Outcome::Completed(CommandOutput::PolicyWritten { replaced }))
            }
            Command::DeployScope {
                caller,
                subject,
                object,
                resource_kind,
            } => {
                let scope_id = self.deploy_scope(caller, subject, object, resource_kind)?;
                Ok(Outcome::Completed(CommandOutput::ScopeDeployed { scope_id }))
            }
            Command::ActivateScope { caller, scope_id } => {
                Ok(self.activate_scope(caller, *scope_id)?.map(done))
            }
            Command::DeactivateScope { caller, scope_id } => {
                Ok(self.deactivate_scope(caller, *scope_id)?.map(done))
            }
            Command::AccessControl {
                caller,
                scope_id,
                resource,
                action,
            } => Ok(self
                .access_control(caller, *scope_id, resource, action.clone())?
                .map(done)),
            Command::CreateAccessRequest {
                caller,
                resource,
                action,
            } => Ok(self
                .create_access_request(caller, resource, action.clone())?
                .map(|id| CommandOutput::RequestCreated { id })),
            Command::HandleAccessRequest {
                caller,
                id,
                approve,
            } => {
                let approved = self.handle_access_request(caller, *id, *approve)?;
                Ok(Outcome::Completed(CommandOutput::Vote { approved }))
            }
            Command::RevokeAccessRequest { caller, id } => {
                self.revoke_access_request(caller, *id)?;
                Ok(Outcome::Completed(CommandOutput::Done))
            }
            Command::ViewGlobalResourceTable { caller } => Ok(self
                .view_global_resource_table(caller)?
                .map(|members| CommandOutput::Snapshot { members })),
            Command::ViewLocalResourceTable { caller } => Ok(self
                .view_local_resource_table(caller)?
                .map(|members| CommandOutput::Snapshot { members })),
            Command::EditGlobalResourceTable { caller, old, new } => Ok(self
                .edit_global_resource_table(caller, old, new)?
                .map(done)),
            Command::DeleteGlobalResourceTable { caller, target } => Ok(self
                .delete_global_resource_table(caller, target)?
                .map(done)),
            Command::RevokeMember { caller, target } => {
                self.revoke_member(caller, target)?;
                Ok(Outcome::Completed(CommandOutput::Done))
            }
        }
    }

    /// Apply commands in order. A failing command does not stop the batch;
    /// its slot holds the error and the remaining commands still run.
    pub fn submit_batch(
        &mut self,
        commands: &[Command],
    ) -> Vec<Result<Outcome<CommandOutput>, AccessError>> {
        tracing::debug!(count = commands.len(), "submitting batch");
        commands.iter().map(|c| self.execute(c)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_json_is_tagged_by_op() {
        let cmd = Command::HandleAccessRequest {
            caller: "ph2".into(),
            id: 0,
            approve: true,
        };
        let json = serde_json::to_value(&cmd).unwrap();
        assert_eq!(json["op"], "handle_access_request");
        assert_eq!(json["caller"], "ph2");
        assert_eq!(cmd.operation(), "handle_access_request");
    }

    #[test]
    fn add_policy_scope_defaults_to_table() {
        let json = r#"{
            "op": "add_policy",
            "caller": "root",
            "role": "primary_head",
            "resource": "GlobalResourceTable",
            "action": "view",
            "permission": "allow"
        }"#;
        let cmd: Command = serde_json::from_str(json).unwrap();
        assert_eq!(
            cmd,
            Command::AddPolicy {
                caller: "root".into(),
                scope_id: None,
                role: Role::PrimaryHead,
                resource: "GlobalResourceTable".into(),
                action: Action::View,
                permission: Permission::Allow,
            }
        );
        assert_eq!(cmd.caller(), "root");
    }

    #[test]
    fn custom_actions_pass_through() {
        let json = r#"{"op":"access_control","caller":"rm1","scope_id":3,"resource":"x","action":"nonexistentAction"}"#;
        let cmd: Command = serde_json::from_str(json).unwrap();
        match cmd {
            Command::AccessControl { action, .. } => {
                assert_eq!(action, Action::Other("nonexistentAction".into()))
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn output_serializes_with_kind() {
        let json = serde_json::to_value(CommandOutput::RequestCreated { id: 4 }).unwrap();
        assert_eq!(json["kind"], "request_created");
        assert_eq!(json["id"], 4);
    }
}
