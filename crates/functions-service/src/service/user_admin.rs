//! 管理员创建用户
//!
//! 先在身份服务创建账号，再写入档案；档案写入失败时删除身份账号

use std::sync::Arc;

use tracing::{error, info, instrument, warn};
use validator::Validate;

use super::require_admin;
use crate::auth::{IdentityProvider, IdentityUserRequest};
use crate::dto::AdminCreateUserRequest;
use crate::error::Result;
use crate::models::{AuditEntry, NewProfile, Profile};
use crate::repository::ProfileRepositoryTrait;

pub struct UserAdminService {
    identity: Arc<dyn IdentityProvider>,
    profiles: Arc<dyn ProfileRepositoryTrait>,
}

impl UserAdminService {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        profiles: Arc<dyn ProfileRepositoryTrait>,
    ) -> Self {
        Self { identity, profiles }
    }

    #[instrument(skip(self, caller, request), fields(caller_id = %caller.id, user_type = %request.user_type))]
    pub async fn create_user(
        &self,
        caller: &Profile,
        mut request: AdminCreateUserRequest,
    ) -> Result<Profile> {
        require_admin(caller)?;

        request.email = request.email.trim().to_lowercase();
        request.full_name = request.full_name.trim().to_string();
        request.validate()?;

        let email = request.email.clone();
        let full_name = request.full_name.clone();

        let user_id = self
            .identity
            .create_user(&IdentityUserRequest {
                email: email.clone(),
                password: request.password,
                full_name: full_name.clone(),
                user_type: request.user_type,
            })
            .await?;

        let profile = NewProfile {
            id: user_id,
            full_name,
            email: email.clone(),
            user_type: request.user_type,
            rifas: request.initial_rifas.unwrap_or(0),
        };
        let audit = AuditEntry::new(caller.id, "user.created", "profile", Some(user_id))
            .with_details(serde_json::json!({
                "email": email,
                "userType": request.user_type,
                "initialRifas": profile.rifas,
            }));

        match self.profiles.create_profile(&profile, &audit).await {
            Ok(created) => {
                info!(%user_id, "user created by admin");
                Ok(created)
            }
            Err(e) => {
                warn!(%user_id, error = %e, "profile insert failed, removing identity user");
                if let Err(cleanup) = self.identity.delete_user(user_id).await {
                    error!(
                        %user_id,
                        error = %cleanup,
                        "failed to remove identity user after profile insert failure"
                    );
                }
                Err(e)
            }
        }
    }
}
