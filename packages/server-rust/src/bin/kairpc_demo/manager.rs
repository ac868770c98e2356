//! Sample stateful service: users, sessions and a per-user rendezvous pipe.

use std::collections::BTreeMap;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TrySendError};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use kairpc_core::{Context, Methods, ServiceObject, Value};
use parking_lot::Mutex;

const SESSION_NOT_FOUND: &str = "session not found";
const USER_NOT_FOUND: &str = "user not found";
const CANCELLED: &str = "request cancelled";

/// How often a blocked `push`/`pop` rechecks for cancellation.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Zero-capacity channel: a push completes only when a pop receives it.
struct Pipe {
    tx: SyncSender<String>,
    rx: Mutex<Receiver<String>>,
}

impl Pipe {
    fn new() -> Self {
        let (tx, rx) = mpsc::sync_channel(0);
        Self {
            tx,
            rx: Mutex::new(rx),
        }
    }
}

#[derive(Default)]
pub struct Manager {
    store: DashMap<String, String>,
    sessions: DashMap<String, String>,
    pipes: DashMap<String, Arc<Pipe>>,
}

impl Manager {
    /// Creates (or resets) a user with an empty store value.
    #[allow(clippy::unnecessary_wraps)]
    pub fn register(&self, username: &str) -> Result<(), String> {
        self.store.insert(username.to_string(), String::new());
        self.pipes.insert(username.to_string(), Arc::new(Pipe::new()));
        Ok(())
    }

    /// Binds the caller's session to an existing user.
    pub fn login(&self, ctx: &Context, username: &str) -> Result<(), String> {
        if !self.store.contains_key(username) {
            return Err(USER_NOT_FOUND.to_string());
        }
        self.sessions
            .insert(ctx.session().to_string(), username.to_string());
        Ok(())
    }

    pub fn details(&self, ctx: &Context) -> Result<BTreeMap<String, Value>, String> {
        let user = self.session_user(ctx).unwrap_or_default();
        let value = self
            .store
            .get(&user)
            .map(|entry| entry.value().clone())
            .ok_or(SESSION_NOT_FOUND)?;

        Ok(BTreeMap::from([
            ("session".to_string(), Value::from(ctx.session())),
            ("user".to_string(), Value::from(user)),
            ("store".to_string(), Value::from(value)),
        ]))
    }

    pub fn get_store(&self, ctx: &Context) -> Result<String, String> {
        let user = self.session_user(ctx).unwrap_or_default();
        self.store
            .get(&user)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| SESSION_NOT_FOUND.to_string())
    }

    pub fn set_store(&self, ctx: &Context, value: String) -> Result<(), String> {
        let user = self.session_user(ctx).ok_or(SESSION_NOT_FOUND)?;
        let mut entry = self.store.get_mut(&user).ok_or(USER_NOT_FOUND)?;
        *entry = value;
        Ok(())
    }

    /// Hands `value` to a concurrent `pop` by the same user, blocking until
    /// one takes it or the request is cancelled.
    pub fn push(&self, ctx: &Context, value: String) -> Result<(), String> {
        let pipe = self.session_pipe(ctx)?;
        let mut pending = value;
        loop {
            match pipe.tx.try_send(pending) {
                Ok(()) => return Ok(()),
                Err(TrySendError::Full(value)) => pending = value,
                Err(TrySendError::Disconnected(_)) => return Err(SESSION_NOT_FOUND.to_string()),
            }
            if ctx.is_cancelled() {
                return Err(CANCELLED.to_string());
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }

    /// Takes the next pushed value, blocking until one arrives or the request
    /// is cancelled.
    pub fn pop(&self, ctx: &Context) -> Result<String, String> {
        let pipe = self.session_pipe(ctx)?;
        let rx = pipe.rx.lock();
        loop {
            match rx.recv_timeout(POLL_INTERVAL) {
                Ok(value) => return Ok(value),
                Err(RecvTimeoutError::Timeout) if !ctx.is_cancelled() => {}
                Err(RecvTimeoutError::Timeout) => return Err(CANCELLED.to_string()),
                Err(RecvTimeoutError::Disconnected) => return Err(SESSION_NOT_FOUND.to_string()),
            }
        }
    }

    pub fn user_count(&self) -> usize {
        self.store.len()
    }

    fn session_user(&self, ctx: &Context) -> Option<String> {
        self.sessions
            .get(ctx.session())
            .map(|entry| entry.value().clone())
    }

    // The map guard is released before the caller blocks on the pipe.
    fn session_pipe(&self, ctx: &Context) -> Result<Arc<Pipe>, String> {
        let user = self.session_user(ctx).unwrap_or_default();
        self.pipes
            .get(&user)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| SESSION_NOT_FOUND.to_string())
    }
}

impl ServiceObject for Manager {
    fn methods(self: Arc<Self>) -> Methods {
        let (register, login, details, get_store, set_store, push) = (
            Arc::clone(&self),
            Arc::clone(&self),
            Arc::clone(&self),
            Arc::clone(&self),
            Arc::clone(&self),
            Arc::clone(&self),
        );
        Methods::new()
            .method("Register", move |username: String| register.register(&username))
            .method("Login", move |ctx: Context, username: String| login.login(&ctx, &username))
            .method("Details", move |ctx: Context| details.details(&ctx))
            .method("GetStore", move |ctx: Context| get_store.get_store(&ctx))
            .method("SetStore", move |ctx: Context, value: String| set_store.set_store(&ctx, value))
            .method("Push", move |ctx: Context, value: String| push.push(&ctx, value))
            .method("Pop", move |ctx: Context| self.pop(&ctx))
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use kairpc_core::{RequestEnvelope, Registry};
    use tokio_util::sync::CancellationToken;

    use super::*;

    fn ctx(session: &str) -> Context {
        Context::new(session, RequestEnvelope::default())
    }

    fn logged_in(manager: &Manager, session: &str, user: &str) -> Context {
        let ctx = ctx(session);
        manager.register(user).unwrap();
        manager.login(&ctx, user).unwrap();
        ctx
    }

    #[test]
    fn login_requires_registered_user() {
        let manager = Manager::default();
        assert_eq!(manager.login(&ctx("s"), "bob").unwrap_err(), USER_NOT_FOUND);
    }

    #[test]
    fn store_round_trip_through_session() {
        let manager = Manager::default();
        let ctx = logged_in(&manager, "s1", "alice");

        manager.set_store(&ctx, "hello".to_string()).unwrap();
        assert_eq!(manager.get_store(&ctx).unwrap(), "hello");

        let details = manager.details(&ctx).unwrap();
        assert_eq!(details["user"], Value::from("alice"));
        assert_eq!(details["store"], Value::from("hello"));
        assert_eq!(details["session"], Value::from("s1"));
    }

    #[test]
    fn unknown_session_is_reported() {
        let manager = Manager::default();
        let stranger = ctx("nobody");
        assert_eq!(manager.get_store(&stranger).unwrap_err(), SESSION_NOT_FOUND);
        assert_eq!(manager.details(&stranger).unwrap_err(), SESSION_NOT_FOUND);
        assert_eq!(
            manager.set_store(&stranger, "x".into()).unwrap_err(),
            SESSION_NOT_FOUND
        );
        assert_eq!(manager.pop(&stranger).unwrap_err(), SESSION_NOT_FOUND);
    }

    #[test]
    fn push_blocks_until_pop() {
        let manager = Arc::new(Manager::default());
        let ctx = logged_in(&manager, "s1", "alice");

        let pusher = {
            let manager = Arc::clone(&manager);
            let ctx = ctx.clone();
            thread::spawn(move || manager.push(&ctx, "ping".to_string()))
        };

        assert_eq!(manager.pop(&ctx).unwrap(), "ping");
        pusher.join().unwrap().unwrap();
    }

    #[test]
    fn cancelled_pop_returns() {
        let manager = Manager::default();
        manager.register("alice").unwrap();
        let token = CancellationToken::new();
        let ctx = Context::with_cancellation("s1", RequestEnvelope::default(), token.clone());
        manager.login(&ctx, "alice").unwrap();

        token.cancel();
        assert_eq!(manager.pop(&ctx).unwrap_err(), CANCELLED);
        assert_eq!(manager.push(&ctx, "x".into()).unwrap_err(), CANCELLED);
    }

    #[test]
    fn registers_as_object() {
        let mut registry = Registry::new();
        registry
            .register_object("manager", Arc::new(Manager::default()))
            .unwrap();

        let result = registry
            .execute(&Context::new(
                "s1",
                RequestEnvelope::new("manager.Login", vec![Value::from("bob")]),
            ))
            .unwrap();
        assert_eq!(result.error.as_deref(), Some(USER_NOT_FOUND));
    }
}
