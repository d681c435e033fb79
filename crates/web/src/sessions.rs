use axum::http::{header, HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};
use robo_core::session::SessionContext;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "robo_session";

const DEFAULT_IDLE_TTL: Duration = Duration::from_secs(30 * 60);

#[derive(Debug)]
struct Entry {
    context: SessionContext,
    last_seen: Instant,
}

/// In-memory session contexts keyed by cookie id. Never held across an await.
/// Sessions idle for longer than the TTL are dropped whenever a new one is
/// created.
#[derive(Debug, Clone)]
pub struct SessionStore {
    inner: Arc<Mutex<HashMap<Uuid, Entry>>>,
    idle_ttl: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_IDLE_TTL)
    }
}

impl SessionStore {
    pub fn new(idle_ttl: Duration) -> Self {
        Self {
            inner: Arc::default(),
            idle_ttl,
        }
    }

    /// Runs `f` against the session, creating it on first use.
    pub fn with<R>(&self, id: Uuid, f: impl FnOnce(&mut SessionContext) -> R) -> R {
        let now = Instant::now();
        let mut sessions = self.lock();
        if !sessions.contains_key(&id) {
            evict_idle(&mut sessions, now, self.idle_ttl);
        }
        let entry = sessions.entry(id).or_insert_with(|| Entry {
            context: SessionContext::default(),
            last_seen: now,
        });
        entry.last_seen = now;
        f(&mut entry.context)
    }

    /// Read-only lookup; unknown ids stay unknown.
    pub fn read<R>(&self, id: Uuid, f: impl FnOnce(&SessionContext) -> R) -> Option<R> {
        let mut sessions = self.lock();
        let entry = sessions.get_mut(&id)?;
        entry.last_seen = Instant::now();
        Some(f(&entry.context))
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, Entry>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn evict_idle(sessions: &mut HashMap<Uuid, Entry>, now: Instant, idle_ttl: Duration) {
    let before = sessions.len();
    // A pending session still has a model call that will write back into it.
    sessions.retain(|_, e| e.context.is_pending() || now.duration_since(e.last_seen) <= idle_ttl);
    let evicted = before - sessions.len();
    if evicted > 0 {
        tracing::debug!(evicted, remaining = sessions.len(), "evicted idle sessions");
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SessionHandle {
    pub id: Uuid,
    fresh: bool,
}

impl SessionHandle {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        match session_id(headers) {
            Some(id) => Self { id, fresh: false },
            None => Self {
                id: Uuid::new_v4(),
                fresh: true,
            },
        }
    }

    /// The id carried by the request, if any. Never mints one.
    pub fn existing(headers: &HeaderMap) -> Option<Uuid> {
        session_id(headers)
    }

    /// Attaches the session cookie when the id was minted by this request.
    pub fn respond(self, response: impl IntoResponse) -> Response {
        let mut response = response.into_response();
        if self.fresh {
            let cookie = format!("{SESSION_COOKIE}={}; Path=/; HttpOnly; SameSite=Lax", self.id);
            match HeaderValue::from_str(&cookie) {
                Ok(value) => {
                    response.headers_mut().append(header::SET_COOKIE, value);
                }
                Err(e) => tracing::error!(error = %e, "invalid session cookie header"),
            }
        }
        response
    }
}

fn session_id(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().strip_prefix(SESSION_COOKIE)?.strip_prefix('='))
        .find_map(|id| Uuid::parse_str(id.trim()).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use robo_core::domain::inputs::RecommendationForm;
    use robo_core::session::Page;

    #[test]
    fn reads_session_id_among_other_cookies() {
        let id = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("theme=dark; {SESSION_COOKIE}={id}; lang=en")).unwrap(),
        );
        let handle = SessionHandle::from_headers(&headers);
        assert_eq!(handle.id, id);
        assert!(!handle.fresh);
    }

    #[test]
    fn mints_id_for_garbage_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("robo_session=not-a-uuid"),
        );
        let handle = SessionHandle::from_headers(&headers);
        assert!(handle.fresh);
        let response = handle.respond("ok");
        assert!(response.headers().get(header::SET_COOKIE).is_some());
    }

    #[test]
    fn read_does_not_create_sessions() {
        let store = SessionStore::default();
        assert_eq!(store.read(Uuid::new_v4(), |s| s.page()), None);
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn idle_sessions_are_evicted() {
        let ttl = Duration::from_secs(60);
        let store = SessionStore::new(ttl);
        let (idle, busy, fresh) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        store.with(idle, |s| s.start());
        store.with(busy, |s| {
            s.begin_submission(RecommendationForm::default()).unwrap();
        });

        let later = Instant::now() + ttl + Duration::from_secs(1);
        let mut sessions = store.lock();
        sessions.insert(
            fresh,
            Entry {
                context: SessionContext::default(),
                last_seen: later,
            },
        );
        evict_idle(&mut sessions, later, ttl);

        assert!(!sessions.contains_key(&idle));
        assert!(sessions.contains_key(&busy));
        assert!(sessions.contains_key(&fresh));
    }

    #[test]
    fn sessions_are_isolated() {
        let store = SessionStore::default();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        store.with(a, |s| s.start());
        assert_eq!(store.with(a, |s| s.page()), Page::Input);
        assert_eq!(store.with(b, |s| s.page()), Page::Home);
        assert_eq!(store.len(), 2);
    }
}
