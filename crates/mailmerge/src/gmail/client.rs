//! Gmail API HTTP client
//!
//! Provides methods for reading drafts and threads and for sending raw
//! MIME messages. Uses synchronous HTTP (ureq) to be executor-agnostic.

use anyhow::{Context, Result, anyhow};
use base64::prelude::*;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::GoogleAuth;
use super::api::{
    AttachmentResponse, DraftRef, GmailDraft, GmailThread, ListDraftsResponse,
    ListThreadsResponse, ProfileResponse, SendRequest, SendResponse, ThreadRef,
};

/// Gmail API client
pub struct GmailClient {
    auth: Arc<GoogleAuth>,
    /// Mailbox address, fetched once from the profile
    identity: Mutex<Option<String>>,
}

impl GmailClient {
    /// Gmail API base URL
    const BASE_URL: &'static str = "https://gmail.googleapis.com/gmail/v1";

    /// Page size for list calls
    const PAGE_SIZE: usize = 100;

    const MAX_RETRIES: u32 = 3;

    /// Create a new Gmail client
    pub fn new(auth: Arc<GoogleAuth>) -> Self {
        Self {
            auth,
            identity: Mutex::new(None),
        }
    }

    fn bearer(&self) -> Result<String> {
        Ok(format!("Bearer {}", self.auth.get_access_token()?))
    }

    // === Drafts API ===

    /// List one page of draft ids
    pub fn list_drafts(&self, page_token: Option<&str>) -> Result<ListDraftsResponse> {
        let mut url = format!(
            "{}/users/me/drafts?maxResults={}",
            Self::BASE_URL,
            Self::PAGE_SIZE
        );
        if let Some(token) = page_token {
            url.push_str(&format!("&pageToken={}", urlencoding::encode(token)));
        }

        let mut response = ureq::get(&url)
            .header("Authorization", &self.bearer()?)
            .call()
            .context("Failed to send list drafts request")?;

        let list: ListDraftsResponse = response
            .body_mut()
            .read_json()
            .context("Failed to parse list drafts response")?;

        Ok(list)
    }

    /// List ALL draft ids, following pagination
    pub fn list_drafts_all(&self) -> Result<Vec<DraftRef>> {
        let mut drafts = Vec::new();
        let mut page_token = None;

        loop {
            let response = self.list_drafts(page_token.as_deref())?;
            drafts.extend(response.drafts.unwrap_or_default());

            match response.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(drafts)
    }

    /// Get a full draft by id
    pub fn get_draft(&self, id: &str) -> Result<GmailDraft> {
        let url = format!("{}/users/me/drafts/{}?format=full", Self::BASE_URL, id);

        let mut response = ureq::get(&url)
            .header("Authorization", &self.bearer()?)
            .call()
            .context("Failed to send get draft request")?;

        let draft: GmailDraft = response
            .body_mut()
            .read_json()
            .context("Failed to parse draft response")?;

        Ok(draft)
    }

    /// Fetch and decode an attachment body
    pub fn get_attachment(&self, message_id: &str, attachment_id: &str) -> Result<Vec<u8>> {
        let url = format!(
            "{}/users/me/messages/{}/attachments/{}",
            Self::BASE_URL,
            message_id,
            attachment_id
        );

        let mut response = ureq::get(&url)
            .header("Authorization", &self.bearer()?)
            .call()
            .context("Failed to send get attachment request")?;

        let attachment: AttachmentResponse = response
            .body_mut()
            .read_json()
            .context("Failed to parse attachment response")?;

        super::normalize::decode_base64_bytes(&attachment.data)
            .context("Attachment data is not valid base64")
    }

    // === Messages API ===

    /// Send an RFC 822 message, optionally into an existing thread
    pub fn send_raw(&self, raw: &[u8], thread_id: Option<&str>) -> Result<SendResponse> {
        let url = format!("{}/users/me/messages/send", Self::BASE_URL);
        let request = SendRequest {
            raw: BASE64_URL_SAFE.encode(raw),
            thread_id: thread_id.map(str::to_string),
        };

        let mut response = ureq::post(&url)
            .header("Authorization", &self.bearer()?)
            .send_json(&request)
            .context("Failed to send message")?;

        let sent: SendResponse = response
            .body_mut()
            .read_json()
            .context("Failed to parse send response")?;

        log::debug!("Sent message {} (thread {:?})", sent.id, sent.thread_id);
        Ok(sent)
    }

    // === Threads API ===

    fn threads_url(query: &str, max_results: usize) -> String {
        format!(
            "{}/users/me/threads?maxResults={}&q={}",
            Self::BASE_URL,
            max_results.clamp(1, Self::PAGE_SIZE),
            urlencoding::encode(query)
        )
    }

    /// List up to `max_results` threads matching a Gmail search query, newest first
    pub fn list_threads(&self, query: &str, max_results: usize) -> Result<Vec<ThreadRef>> {
        let mut response = ureq::get(&Self::threads_url(query, max_results))
            .header("Authorization", &self.bearer()?)
            .call()
            .context("Failed to send list threads request")?;

        let list: ListThreadsResponse = response
            .body_mut()
            .read_json()
            .context("Failed to parse list threads response")?;

        let mut threads = list.threads.unwrap_or_default();
        threads.truncate(max_results);
        Ok(threads)
    }

    /// Get a full thread by id
    pub fn get_thread(&self, id: &str) -> Result<GmailThread> {
        let url = format!("{}/users/me/threads/{}?format=full", Self::BASE_URL, id);

        let mut response = ureq::get(&url)
            .header("Authorization", &self.bearer()?)
            .call()
            .context("Failed to send get thread request")?;

        let thread: GmailThread = response
            .body_mut()
            .read_json()
            .context("Failed to parse thread response")?;

        Ok(thread)
    }

    /// Get a thread with exponential backoff retry
    pub fn get_thread_with_retry(&self, id: &str) -> Result<GmailThread> {
        let mut last_error = None;
        let mut delay = Duration::from_millis(100);

        for attempt in 0..Self::MAX_RETRIES {
            match self.get_thread(id) {
                Ok(thread) => return Ok(thread),
                Err(e) => {
                    log::debug!("get_thread {} attempt {} failed: {:#}", id, attempt + 1, e);
                    last_error = Some(e);
                    if attempt < Self::MAX_RETRIES - 1 {
                        let jitter = Duration::from_millis(rand_jitter());
                        std::thread::sleep(delay + jitter);
                        delay *= 2;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow!("Failed to fetch thread {}", id)))
    }

    // === Users API ===

    /// Get the mailbox owner's profile
    pub fn get_profile(&self) -> Result<ProfileResponse> {
        let url = format!("{}/users/me/profile", Self::BASE_URL);

        let mut response = ureq::get(&url)
            .header("Authorization", &self.bearer()?)
            .call()
            .context("Failed to send get profile request")?;

        let profile: ProfileResponse = response
            .body_mut()
            .read_json()
            .context("Failed to parse profile response")?;

        Ok(profile)
    }

    /// The mailbox owner's address, cached after the first lookup
    pub fn identity(&self) -> Result<String> {
        let mut cached = self
            .identity
            .lock()
            .map_err(|_| anyhow!("identity lock poisoned"))?;
        if let Some(identity) = cached.as_ref() {
            return Ok(identity.clone());
        }
        let identity = self.get_profile()?.email_address;
        *cached = Some(identity.clone());
        Ok(identity)
    }

    /// Trigger authentication flow
    pub fn authenticate(&self) -> Result<()> {
        self.auth.get_access_token()?;
        Ok(())
    }
}

/// Generate a random jitter value (0-100ms)
fn rand_jitter() -> u64 {
    use std::collections::hash_map::RandomState;
    use std::hash::{BuildHasher, Hasher};

    let hasher = RandomState::new().build_hasher();
    hasher.finish() % 100
}
