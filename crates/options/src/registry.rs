//! The option registry: per-identifier slots, the change ladder, and commit.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace};
use vigil_values::{TypeDesc, Value, ValueError, coerce_candidate, from_broker};

use crate::error::OptionError;
use crate::handler::{HandlerFn, HandlerSignature, RegisteredHandler, run_chain};

/// A proposed new value: either natively typed, or the broker's generic
/// representation still to be bridged against the declared type.
#[derive(Debug)]
pub enum Candidate {
    Native(Value),
    Broker(serde_json::Value),
}

impl From<Value> for Candidate {
    fn from(value: Value) -> Self {
        Self::Native(value)
    }
}

static NEXT_THREAD_TOKEN: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static THREAD_TOKEN: u64 = NEXT_THREAD_TOKEN.fetch_add(1, Ordering::Relaxed);
}

fn thread_token() -> u64 {
    THREAD_TOKEN.with(|token| *token)
}

#[derive(Debug, Default)]
struct SlotInner {
    /// Kept sorted by rank: negated priority, then registration sequence.
    handlers: Vec<RegisteredHandler>,
    next_seq: u64,
}

/// One registered option. The slot mutex serializes the whole
/// chain-plus-commit window for parallel callers; the published value lives
/// outside it so reads never contend with handler execution.
#[derive(Debug)]
struct OptionSlot {
    name: String,
    declared: TypeDesc,
    /// Thread token of an in-flight change, 0 when idle. A change from the
    /// owning thread itself is re-entrant and rejected instead of deadlocking.
    owner: AtomicU64,
    current: RwLock<Option<Arc<Value>>>,
    inner: Mutex<SlotInner>,
}

#[derive(Debug)]
enum IdentEntry {
    /// Declared as a mutable option.
    Option(Arc<OptionSlot>),
    /// Exists, but is not changeable at runtime.
    Const,
}

/// Process-scoped store mapping identifiers to option slots.
///
/// Owned explicitly by the embedding runtime; there is no ambient global
/// instance. All failures are plain result values and leave the stored
/// option value untouched.
#[derive(Debug, Default)]
pub struct Registry {
    idents: RwLock<HashMap<String, IdentEntry>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a mutable option with its type and initial value. The
    /// embedding runtime calls this once per option identifier; an option
    /// is never without a value afterwards.
    pub fn declare_option(
        &self,
        name: impl Into<String>,
        declared: TypeDesc,
        default: Value,
    ) -> Result<(), OptionError> {
        let name = name.into();
        if !declared.is_concrete() {
            return Err(ValueError::clash(declared.to_string(), "a concrete option type").into());
        }
        let default = coerce_candidate(default, &declared)?;

        let mut idents = self.idents.write();
        if idents.contains_key(&name) {
            return Err(OptionError::AlreadyDeclared { id: name });
        }
        trace!(name = %name, ty = %declared, "option declared");
        idents.insert(
            name.clone(),
            IdentEntry::Option(Arc::new(OptionSlot {
                name,
                declared,
                owner: AtomicU64::new(0),
                current: RwLock::new(Some(Arc::new(default))),
                inner: Mutex::new(SlotInner::default()),
            })),
        );
        Ok(())
    }

    /// Declares an identifier that exists but is not a mutable option, so
    /// changes against it fail with `NotAnOption` rather than `NotFound`.
    pub fn declare_const(&self, name: impl Into<String>) -> Result<(), OptionError> {
        let name = name.into();
        let mut idents = self.idents.write();
        if idents.contains_key(&name) {
            return Err(OptionError::AlreadyDeclared { id: name });
        }
        idents.insert(name, IdentEntry::Const);
        Ok(())
    }

    fn slot(&self, name: &str) -> Result<Arc<OptionSlot>, OptionError> {
        match self.idents.read().get(name) {
            None => Err(OptionError::NotFound { id: name.into() }),
            Some(IdentEntry::Const) => Err(OptionError::NotAnOption { id: name.into() }),
            Some(IdentEntry::Option(slot)) => Ok(Arc::clone(slot)),
        }
    }

    /// Proposes a new value for `name`, threading it through the option's
    /// change-handler chain. On success exactly one value replacement
    /// becomes visible to subsequent reads; on any failure the stored value
    /// is unchanged.
    ///
    /// `location` names the origin of the change (e.g. a config file
    /// position) and is handed to 3-argument handlers.
    pub fn set(
        &self,
        name: &str,
        candidate: impl Into<Candidate>,
        location: &str,
    ) -> Result<(), OptionError> {
        let slot = self.slot(name)?;

        let token = thread_token();
        if slot.owner.load(Ordering::Acquire) == token {
            return Err(OptionError::Reentrant { id: name.into() });
        }

        let inner = slot.inner.lock();
        slot.owner.store(token, Ordering::Release);
        let _idle = scopeguard::guard(&slot, |slot| {
            slot.owner.store(0, Ordering::Release);
        });

        // The lifecycle guarantees a declared option always has a value.
        if slot.current.read().is_none() {
            debug_assert!(false, "option '{name}' lost its value");
            return Err(OptionError::Uninitialized { id: name.into() });
        }

        let candidate = match candidate.into() {
            Candidate::Broker(foreign) => from_broker(&foreign, &slot.declared)?,
            Candidate::Native(value) => coerce_candidate(value, &slot.declared)?,
        };

        let committed = run_chain(&inner.handlers, &slot.name, candidate, location)
            .ok_or_else(|| OptionError::HandlerRejected { id: name.into() })?;

        // Publish a fresh immutable snapshot; the chain output is moved in,
        // so no caller retains an alias to the stored value.
        *slot.current.write() = Some(Arc::new(committed));
        debug!(name = %slot.name, location, "option value changed");
        Ok(())
    }

    /// Registers a change handler for `name` at the given priority.
    /// Numerically higher priorities run first; equal priorities run in
    /// registration order.
    pub fn add_change_handler(
        &self,
        name: &str,
        signature: HandlerSignature,
        func: HandlerFn,
        priority: i64,
    ) -> Result<(), OptionError> {
        let slot = self.slot(name)?;
        signature.validate(&slot.declared, func.arity())?;

        let mut inner = slot.inner.lock();
        let seq = inner.next_seq;
        inner.next_seq += 1;

        // Negated priority realizes "higher priority first" under the
        // natural ascending sort.
        let rank = (-priority, seq);
        let at = inner
            .handlers
            .partition_point(|handler| handler.rank <= rank);
        inner.handlers.insert(at, RegisteredHandler { rank, func });

        trace!(name = %slot.name, priority, seq, "change handler registered");
        Ok(())
    }

    /// Current value of an option, if the identifier names one.
    pub fn get(&self, name: &str) -> Option<Arc<Value>> {
        match self.idents.read().get(name) {
            Some(IdentEntry::Option(slot)) => slot.current.read().clone(),
            _ => None,
        }
    }

    /// Declared type of an option, if the identifier names one.
    pub fn declared_type(&self, name: &str) -> Option<TypeDesc> {
        match self.idents.read().get(name) {
            Some(IdentEntry::Option(slot)) => Some(slot.declared.clone()),
            _ => None,
        }
    }

    pub fn is_option(&self, name: &str) -> bool {
        matches!(self.idents.read().get(name), Some(IdentEntry::Option(_)))
    }

    /// Identifiers declared as options, in no particular order.
    pub fn option_names(&self) -> Vec<String> {
        self.idents
            .read()
            .iter()
            .filter(|(_, entry)| matches!(entry, IdentEntry::Option(_)))
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.idents.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.idents.read().is_empty()
    }
}
