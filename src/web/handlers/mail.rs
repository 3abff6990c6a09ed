//! Mail handlers for Web API.

use axum::{
    body::Body,
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::Response,
    Json,
};
use std::sync::Arc;

use crate::account::AccountRepository;
use crate::attachment::AttachmentFile;
use crate::mail::{Mail, SendMailRequest};
use crate::web::dto::{
    AffectedResponse, ApiResponse, MailDetailResponse, MailIdsRequest, MailSummaryResponse,
    PartyDirectory, UnreadCountResponse, ValidatedJson,
};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::AuthUser;

/// Look up the addresses of every account taking part in the given mails.
async fn load_parties(state: &AppState, mails: &[Mail]) -> Result<PartyDirectory, ApiError> {
    let repo = AccountRepository::new(state.db.pool());
    let mut parties = PartyDirectory::default();

    for id in mails.iter().flat_map(|m| [m.sender_id, m.recipient_id]) {
        if parties.contains(id) {
            continue;
        }
        match repo.get_by_id(id).await? {
            Some(account) => parties.insert(id, account.address),
            None => tracing::warn!("Mail party {} has no account", id),
        }
    }

    Ok(parties)
}

async fn summaries(
    state: &AppState,
    mails: Vec<Mail>,
) -> Result<Json<ApiResponse<Vec<MailSummaryResponse>>>, ApiError> {
    let parties = load_parties(state, &mails).await?;
    let data = mails.iter().map(|m| parties.summary(m)).collect();
    Ok(Json(ApiResponse::new(data)))
}

async fn detail(
    state: &AppState,
    mail: Mail,
) -> Result<Json<ApiResponse<MailDetailResponse>>, ApiError> {
    let parties = load_parties(state, std::slice::from_ref(&mail)).await?;
    Ok(Json(ApiResponse::new(parties.detail(mail))))
}

/// Generate a safe Content-Disposition header value for attachment downloads.
///
/// Control characters, quotes and backslashes are stripped from the plain
/// `filename` parameter; non-ASCII names also get an RFC 5987 `filename*`.
fn content_disposition_header(filename: &str) -> String {
    let sanitized: String = filename
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| match c {
            '"' | '\\' => '_',
            _ => c,
        })
        .collect();

    if filename.is_ascii() && sanitized == filename {
        return format!("attachment; filename=\"{}\"", filename);
    }

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        sanitized,
        urlencoding::encode(filename)
    )
}

fn is_attachment_field(name: &str) -> bool {
    matches!(name, "attachments" | "attachments[]" | "attachment")
}

/// POST /api/mail/send - Send a mail.
///
/// Multipart fields: `recipient`, `subject`, `body`, optional `digest` and
/// `parentMailId`, and any number of `attachments` file parts.
pub async fn send_mail(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<MailDetailResponse>>), ApiError> {
    let mut recipient = None;
    let mut subject = String::new();
    let mut body = String::new();
    let mut digest = None;
    let mut parent_mail_id = None;
    let mut attachments = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or("").to_string();

        if is_attachment_field(&name) {
            let filename = field.file_name().unwrap_or("").to_string();
            let content_type = field.content_type().map(|s| s.to_string());
            let data = field.bytes().await?;
            // Browsers submit an empty part when no file was chosen
            if filename.is_empty() && data.is_empty() {
                continue;
            }
            let filename = if filename.is_empty() {
                "attachment".to_string()
            } else {
                filename
            };
            attachments.push(AttachmentFile::new(filename, content_type, data.to_vec()));
            continue;
        }

        match name.as_str() {
            "recipient" => recipient = Some(field.text().await?),
            "subject" => subject = field.text().await?,
            "body" => body = field.text().await?,
            "digest" => digest = Some(field.text().await?),
            "parentMailId" | "parent_mail_id" => parent_mail_id = Some(field.text().await?),
            other => tracing::debug!("Ignoring multipart field {:?}", other),
        }
    }

    let recipient = recipient
        .filter(|r| !r.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("recipient is required"))?;

    let mut request = SendMailRequest::new(auth.account_id(), recipient, subject, body)
        .with_attachments(attachments);
    if let Some(digest) = digest.filter(|d| !d.trim().is_empty()) {
        request = request.with_digest(digest.trim());
    }
    if let Some(parent) = parent_mail_id.filter(|p| !p.trim().is_empty()) {
        request = request.with_parent(parent.trim());
    }

    let mail = state.mail().send(request).await?;
    let Json(response) = detail(&state, mail).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /api/mail/inbox/me - List received mails.
pub async fn inbox(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<Vec<MailSummaryResponse>>>, ApiError> {
    let mails = state.mail().fetch_inbox(auth.account_id()).await?;
    summaries(&state, mails).await
}

/// GET /api/mail/outbox/me - List sent mails.
pub async fn outbox(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<Vec<MailSummaryResponse>>>, ApiError> {
    let mails = state.mail().fetch_outbox(auth.account_id()).await?;
    summaries(&state, mails).await
}

/// GET /api/mail/unread-count - Count unread received mails.
pub async fn unread_count(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<UnreadCountResponse>>, ApiError> {
    let count = state.mail().count_unread(auth.account_id()).await?;
    Ok(Json(ApiResponse::new(UnreadCountResponse { count })))
}

/// GET /api/mail/:id - Get a mail.
pub async fn get_mail(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(mail_id): Path<String>,
) -> Result<Json<ApiResponse<MailDetailResponse>>, ApiError> {
    let mail = state.mail().fetch_mail(&mail_id, auth.account_id()).await?;
    detail(&state, mail).await
}

/// GET /api/mail/:id/replies - List replies to a mail.
pub async fn replies(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(mail_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<MailSummaryResponse>>>, ApiError> {
    let mails = state
        .mail()
        .list_replies(&mail_id, auth.account_id())
        .await?;
    summaries(&state, mails).await
}

/// GET /api/mail/:id/attachments/:position - Download one attachment.
pub async fn download_attachment(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path((mail_id, position)): Path<(String, usize)>,
) -> Result<Response, ApiError> {
    let file = state
        .mail()
        .fetch_attachment(&mail_id, auth.account_id(), position)
        .await?;

    Response::builder()
        .header(header::CONTENT_TYPE, file.resolved_content_type())
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition_header(&file.filename),
        )
        .header(header::CONTENT_LENGTH, file.data.len())
        .body(Body::from(file.data))
        .map_err(|e| {
            tracing::error!("Failed to build response: {}", e);
            ApiError::internal("Failed to build response")
        })
}

/// POST /api/mail/read-many - Mark received mails as read.
pub async fn mark_read_many(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ValidatedJson(req): ValidatedJson<MailIdsRequest>,
) -> Result<Json<ApiResponse<AffectedResponse>>, ApiError> {
    let affected = state
        .mail()
        .mark_many_as_read(&req.mail_ids, auth.account_id())
        .await?;
    Ok(Json(ApiResponse::new(AffectedResponse { affected })))
}

/// DELETE /api/mail/sender/delete-many - Delete sent mails.
pub async fn delete_many_for_sender(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ValidatedJson(req): ValidatedJson<MailIdsRequest>,
) -> Result<Json<ApiResponse<AffectedResponse>>, ApiError> {
    let affected = state
        .mail()
        .delete_many_for_sender(&req.mail_ids, auth.account_id())
        .await?;
    Ok(Json(ApiResponse::new(AffectedResponse { affected })))
}

/// DELETE /api/mail/recipient/delete-many - Delete received mails.
pub async fn delete_many_for_recipient(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ValidatedJson(req): ValidatedJson<MailIdsRequest>,
) -> Result<Json<ApiResponse<AffectedResponse>>, ApiError> {
    let affected = state
        .mail()
        .delete_many_for_recipient(&req.mail_ids, auth.account_id())
        .await?;
    Ok(Json(ApiResponse::new(AffectedResponse { affected })))
}

/// DELETE /api/mail/sender/delete/:id - Delete one sent mail.
pub async fn delete_for_sender(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(mail_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .mail()
        .delete_for_sender(&mail_id, auth.account_id())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/mail/recipient/delete/:id - Delete one received mail.
pub async fn delete_for_recipient(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(mail_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .mail()
        .delete_for_recipient(&mail_id, auth.account_id())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_disposition_ascii() {
        assert_eq!(
            content_disposition_header("report.pdf"),
            "attachment; filename=\"report.pdf\""
        );
    }

    #[test]
    fn test_content_disposition_strips_injection() {
        let value = content_disposition_header("a\"b\r\nX-Evil: 1.txt");
        assert!(value.starts_with("attachment; filename=\"a_bX-Evil: 1.txt\""));
        assert!(!value.contains('\n'));
        assert!(value.contains("filename*=UTF-8''"));
    }

    #[test]
    fn test_content_disposition_unicode() {
        let value = content_disposition_header("日本.txt");
        assert_eq!(
            value,
            "attachment; filename=\"日本.txt\"; filename*=UTF-8''%E6%97%A5%E6%9C%AC.txt"
        );
    }

    #[test]
    fn test_attachment_field_names() {
        assert!(is_attachment_field("attachments"));
        assert!(is_attachment_field("attachments[]"));
        assert!(!is_attachment_field("subject"));
    }
}
