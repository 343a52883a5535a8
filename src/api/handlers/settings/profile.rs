//! `/settings/profile`: edit the profile and sign out of other sessions.

use axum::{
    extract::{Extension, Form, rejection::FormRejection},
    http::{HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{info, instrument};
use url::Url;
use utoipa::ToSchema;

use super::storage::{Profile, fetch_profile, upsert_profile};
use crate::api::{
    error::PageError,
    forms::FormErrors,
    handlers::{
        auth::{AuthState, Identity, require_user_id, storage as auth_storage},
        html,
    },
    pages,
};

const NAME_MAX: usize = 50;
const BIO_MAX: usize = 160;

pub const UPDATE_PROFILE_INTENT: &str = "update-profile";
pub const SIGN_OUT_OF_SESSIONS_INTENT: &str = "sign-out-of-sessions";

#[derive(Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileForm {
    /// `update-profile` or `sign-out-of-sessions`.
    #[serde(default)]
    intent: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    bio: String,
    #[serde(default)]
    website: String,
}

enum Intent {
    UpdateProfile,
    SignOutOfSessions,
}

impl Intent {
    fn parse(value: &str) -> Option<Self> {
        match value {
            UPDATE_PROFILE_INTENT => Some(Self::UpdateProfile),
            SIGN_OUT_OF_SESSIONS_INTENT => Some(Self::SignOutOfSessions),
            _ => None,
        }
    }
}

fn validate_profile(form: &ProfileForm) -> Result<Profile, FormErrors> {
    let mut errors = FormErrors::new();
    let name = form.name.trim();
    let bio = form.bio.trim();
    let website = form.website.trim();
    if name.chars().count() > NAME_MAX {
        errors.field("name", "Name is too long");
    }
    if bio.chars().count() > BIO_MAX {
        errors.field("bio", "Bio is too long");
    }
    if !website.is_empty()
        && !Url::parse(website).is_ok_and(|url| matches!(url.scheme(), "http" | "https"))
    {
        errors.field("website", "Website must be a valid URL");
    }
    if errors.is_empty() {
        Ok(Profile {
            name: name.to_string(),
            bio: bio.to_string(),
            website: website.to_string(),
        })
    } else {
        Err(errors)
    }
}

struct PageData {
    username: String,
    email: String,
    other_sessions: i64,
}

async fn load_page(pool: &PgPool, identity: Identity) -> anyhow::Result<Option<PageData>> {
    let Some(user) = auth_storage::find_user_by_id(pool, identity.user_id).await? else {
        return Ok(None);
    };
    let other_sessions =
        auth_storage::count_other_sessions(pool, identity.user_id, identity.session_id).await?;
    Ok(Some(PageData {
        username: user.username,
        email: user.email,
        other_sessions,
    }))
}

fn render(data: &PageData, profile: &Profile, errors: &FormErrors, status: StatusCode) -> Response {
    let fields = [
        pages::input(
            "Name",
            "name",
            "text",
            &profile.name,
            errors.field_errors("name"),
        ),
        pages::textarea("Bio", "bio", &profile.bio, errors.field_errors("bio")),
        pages::input(
            "Website",
            "website",
            "url",
            &profile.website,
            errors.field_errors("website"),
        ),
        pages::submit_intent("Save changes", UPDATE_PROFILE_INTENT),
    ]
    .concat();

    let sessions = if data.other_sessions > 0 {
        let label = if data.other_sessions == 1 {
            "Sign out of 1 other session".to_string()
        } else {
            format!("Sign out of {} other sessions", data.other_sessions)
        };
        pages::form(
            "sessions-form",
            "/settings/profile",
            &pages::submit_intent(&label, SIGN_OUT_OF_SESSIONS_INTENT),
            &[],
        )
    } else {
        "<p>This is your only session</p>".to_string()
    };

    let body = format!(
        "<main><h1>Profile</h1><p>{} &lt;{}&gt;</p>{}\
<p><a href=\"/settings/profile/password\">Change Password</a></p>{}\
<p><a href=\"/\">Home</a></p></main>",
        pages::escape(&data.username),
        pages::escape(&data.email),
        pages::form("profile-form", "/settings/profile", &fields, errors.form_errors()),
        sessions
    );
    html(status, "Profile", &body)
}

#[utoipa::path(
    get,
    path = "/settings/profile",
    responses(
        (status = 200, description = "Profile form and session count", content_type = "text/html", body = String),
        (status = 303, description = "Not logged in, redirect to /login")
    ),
    tag = "settings"
)]
pub async fn profile_page(
    headers: HeaderMap,
    uri: Uri,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> Response {
    let identity = match require_user_id(&headers, &uri, &pool, &auth_state).await {
        Ok(identity) => identity,
        Err(response) => return response,
    };
    let data = match load_page(&pool, identity).await {
        Ok(Some(data)) => data,
        Ok(None) => return PageError::NotFound.into_response(),
        Err(err) => return PageError::from(err).into_response(),
    };
    match fetch_profile(&pool, identity.user_id).await {
        Ok(profile) => render(&data, &profile, &FormErrors::new(), StatusCode::OK),
        Err(err) => PageError::from(err).into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/settings/profile",
    request_body(content = ProfileForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Change applied"),
        (status = 400, description = "Invalid intent or profile values", content_type = "text/html", body = String)
    ),
    tag = "settings"
)]
#[instrument(skip_all)]
pub async fn profile(
    headers: HeaderMap,
    uri: Uri,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    form: Result<Form<ProfileForm>, FormRejection>,
) -> Response {
    let identity = match require_user_id(&headers, &uri, &pool, &auth_state).await {
        Ok(identity) => identity,
        Err(response) => return response,
    };
    let Ok(Form(form)) = form else {
        return PageError::BadRequest("Invalid form submission").into_response();
    };
    let Some(intent) = Intent::parse(&form.intent) else {
        return PageError::BadRequest("Invalid intent").into_response();
    };

    match intent {
        Intent::UpdateProfile => {
            let profile = match validate_profile(&form) {
                Ok(profile) => profile,
                Err(errors) => {
                    let submitted = Profile {
                        name: form.name.clone(),
                        bio: form.bio.clone(),
                        website: form.website.clone(),
                    };
                    return match load_page(&pool, identity).await {
                        Ok(Some(data)) => {
                            render(&data, &submitted, &errors, StatusCode::BAD_REQUEST)
                        }
                        Ok(None) => PageError::NotFound.into_response(),
                        Err(err) => PageError::from(err).into_response(),
                    };
                }
            };
            if let Err(err) = upsert_profile(&pool, identity.user_id, &profile).await {
                return PageError::from(err).into_response();
            }
        }
        Intent::SignOutOfSessions => {
            match auth_storage::delete_other_sessions(&pool, identity.user_id, identity.session_id)
                .await
            {
                Ok(count) => info!(count, "signed out of other sessions"),
                Err(err) => return PageError::from(err).into_response(),
            }
        }
    }

    Redirect::to("/settings/profile").into_response()
}
