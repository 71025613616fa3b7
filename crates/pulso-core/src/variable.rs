//! Observable scalar variables and the graph geometry types built on them.
//!
//! A [`Variable`] is a shared, mutable scalar with change notification.
//! Channels hold the *same* variable, not copies of its value, so two
//! channels that negotiated a common block size stay in lockstep when it
//! changes later. Equality between variables is identity, not value: two
//! variables holding 512 are only "the same block size" if they are the same
//! shared cell.
//!
//! [`BlockSize`], [`SampleRate`] and [`Overlap`] wrap variables with their
//! sentinel and domain rules, and carry the process-wide defaults used by
//! [`BlockSize::decide`] / [`SampleRate::decide`] during geometry
//! negotiation.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

/// Scalar value types a [`Variable`] can hold.
///
/// `bits_eq` is the no-op test for `set_value`: a write of a bit-identical
/// value must not notify receivers, and for floats that test has to be on
/// the representation, not `==` (which would treat `-0.0` and `0.0` as the
/// same and `NaN` as always different).
pub trait ScalarValue: Copy + PartialEq + fmt::Debug + 'static {
    /// Representation-level equality.
    fn bits_eq(self, other: Self) -> bool;
}

impl ScalarValue for usize {
    #[inline]
    fn bits_eq(self, other: Self) -> bool {
        self == other
    }
}

impl ScalarValue for f64 {
    #[inline]
    fn bits_eq(self, other: Self) -> bool {
        self.to_bits() == other.to_bits()
    }
}

/// Receiver notified synchronously when a [`Variable`] changes value.
pub trait VariableReceiver<T: ScalarValue> {
    /// Called after the variable has stored `value`.
    fn variable_changed(&mut self, value: T);
}

struct VariableInner<T: ScalarValue> {
    value: T,
    receivers: Vec<Weak<RefCell<dyn VariableReceiver<T>>>>,
}

/// A shared observable scalar.
///
/// Cloning is cheap and yields another handle to the same cell. `PartialEq`
/// is identity (same cell), which is what geometry negotiation compares.
pub struct Variable<T: ScalarValue> {
    inner: Rc<RefCell<VariableInner<T>>>,
}

impl<T: ScalarValue> Clone for Variable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: ScalarValue> PartialEq for Variable<T> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T: ScalarValue> fmt::Debug for Variable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Variable").field(&self.value()).finish()
    }
}

impl<T: ScalarValue> Variable<T> {
    /// Create a new independent variable holding `value`.
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(RefCell::new(VariableInner {
                value,
                receivers: Vec::new(),
            })),
        }
    }

    /// Current value.
    pub fn value(&self) -> T {
        self.inner.borrow().value
    }

    /// Store `value` and notify live receivers.
    ///
    /// A bit-identical write is a complete no-op. Receivers are called after
    /// the store, outside the internal borrow, so they may read this
    /// variable (but not mutate it) from the callback.
    pub fn set_value(&self, value: T) {
        let live: Vec<Rc<RefCell<dyn VariableReceiver<T>>>> = {
            let mut inner = self.inner.borrow_mut();
            if inner.value.bits_eq(value) {
                return;
            }
            inner.value = value;
            inner.receivers.retain(|w| w.strong_count() > 0);
            inner.receivers.iter().filter_map(Weak::upgrade).collect()
        };
        for receiver in live {
            receiver.borrow_mut().variable_changed(value);
        }
    }

    /// Register `receiver` for change notification. Held weakly; dead
    /// receivers are pruned on the next set or removal.
    pub fn add_receiver(&self, receiver: &Rc<RefCell<dyn VariableReceiver<T>>>) {
        self.inner
            .borrow_mut()
            .receivers
            .push(Rc::downgrade(receiver));
    }

    /// Deregister `receiver` (matched by identity). Removing a receiver
    /// that was never added is a no-op.
    pub fn remove_receiver(&self, receiver: &Rc<RefCell<dyn VariableReceiver<T>>>) {
        self.inner.borrow_mut().receivers.retain(|w| {
            w.upgrade()
                .is_some_and(|r| !std::ptr::addr_eq(Rc::as_ptr(&r), Rc::as_ptr(receiver)))
        });
    }

    #[cfg(test)]
    fn num_receivers(&self) -> usize {
        self.inner.borrow().receivers.len()
    }
}

macro_rules! geometry_newtype {
    ($(#[$doc:meta])* $name:ident, $ty:ty) => {
        $(#[$doc])*
        #[derive(Clone, PartialEq, Debug)]
        pub struct $name(Variable<$ty>);

        impl $name {
            /// Current value.
            pub fn value(&self) -> $ty {
                self.0.value()
            }

            /// Register a change receiver on the underlying variable.
            pub fn add_receiver(&self, receiver: &Rc<RefCell<dyn VariableReceiver<$ty>>>) {
                self.0.add_receiver(receiver);
            }

            /// Deregister a change receiver.
            pub fn remove_receiver(&self, receiver: &Rc<RefCell<dyn VariableReceiver<$ty>>>) {
                self.0.remove_receiver(receiver);
            }
        }
    };
}

geometry_newtype! {
    /// A shared block-size variable.
    ///
    /// The value 0 is the "no preference" sentinel used during negotiation;
    /// a channel never runs with block size 0.
    BlockSize, usize
}

geometry_newtype! {
    /// A shared sample-rate variable in Hz. 0.0 is "no preference".
    SampleRate, f64
}

geometry_newtype! {
    /// A shared overlap variable in `(0, 1]`.
    ///
    /// 1.0 is contiguous blocks; 0.5 means successive blocks overlap by half
    /// their length (the hop is half a block).
    Overlap, f64
}

thread_local! {
    static DEFAULT_BLOCK_SIZE: BlockSize = BlockSize(Variable::new(512));
    static BLOCK_SIZE_ONE: BlockSize = BlockSize(Variable::new(1));
    static DEFAULT_SAMPLE_RATE: SampleRate = SampleRate(Variable::new(44100.0));
    static OVERLAP_ONE: Overlap = Overlap(Variable::new(1.0));
}

impl BlockSize {
    /// A new independent block size. `value` may be 0 for "no preference".
    pub fn new(value: usize) -> Self {
        Self(Variable::new(value))
    }

    /// The "no preference" sentinel.
    pub fn no_preference() -> Self {
        Self::new(0)
    }

    /// The process-default block size (one shared variable per thread).
    pub fn default_shared() -> Self {
        DEFAULT_BLOCK_SIZE.with(Clone::clone)
    }

    /// The shared single-sample block size used by constant channels.
    pub fn one() -> Self {
        BLOCK_SIZE_ONE.with(Clone::clone)
    }

    /// Change the process-default block size. Every channel that adopted
    /// the default resizes its output through the receiver chain.
    pub fn set_default(value: usize) {
        assert!(value > 0, "default block size must be positive");
        #[cfg(feature = "tracing")]
        tracing::debug!(value, "default block size changed");
        DEFAULT_BLOCK_SIZE.with(|b| b.set_value(value));
    }

    /// Store a new value and notify receivers.
    pub fn set_value(&self, value: usize) {
        self.0.set_value(value);
    }

    /// True if this is a "no preference" sentinel value.
    pub fn is_no_preference(&self) -> bool {
        self.value() == 0
    }

    /// Preference selection: `preferred` if it states one, else `fallback`,
    /// else the process default. The result always has a positive value.
    pub fn decide(preferred: BlockSize, fallback: BlockSize) -> BlockSize {
        if !preferred.is_no_preference() {
            preferred
        } else if !fallback.is_no_preference() {
            fallback
        } else {
            Self::default_shared()
        }
    }

    /// The variable whose current value is larger (self on ties).
    pub fn select_max(&self, other: &BlockSize) -> BlockSize {
        if other.value() > self.value() {
            other.clone()
        } else {
            self.clone()
        }
    }
}

impl Default for BlockSize {
    fn default() -> Self {
        Self::default_shared()
    }
}

impl SampleRate {
    /// A new independent sample rate. `value` may be 0.0 for "no preference".
    pub fn new(value: f64) -> Self {
        assert!(value >= 0.0, "sample rate cannot be negative");
        Self(Variable::new(value))
    }

    /// The "no preference" sentinel.
    pub fn no_preference() -> Self {
        Self::new(0.0)
    }

    /// The process-default sample rate (one shared variable per thread).
    pub fn default_shared() -> Self {
        DEFAULT_SAMPLE_RATE.with(Clone::clone)
    }

    /// Change the process-default sample rate.
    pub fn set_default(value: f64) {
        assert!(value > 0.0, "default sample rate must be positive");
        #[cfg(feature = "tracing")]
        tracing::debug!(value, "default sample rate changed");
        DEFAULT_SAMPLE_RATE.with(|r| r.set_value(value));
    }

    /// Store a new value and notify receivers.
    pub fn set_value(&self, value: f64) {
        assert!(value >= 0.0, "sample rate cannot be negative");
        self.0.set_value(value);
    }

    /// True if this is a "no preference" sentinel value.
    pub fn is_no_preference(&self) -> bool {
        self.value() == 0.0
    }

    /// Preference selection: `preferred` if it states one, else `fallback`,
    /// else the process default.
    pub fn decide(preferred: SampleRate, fallback: SampleRate) -> SampleRate {
        if !preferred.is_no_preference() {
            preferred
        } else if !fallback.is_no_preference() {
            fallback
        } else {
            Self::default_shared()
        }
    }

    /// The variable whose current value is larger (self on ties).
    pub fn select_max(&self, other: &SampleRate) -> SampleRate {
        if other.value() > self.value() {
            other.clone()
        } else {
            self.clone()
        }
    }
}

impl Default for SampleRate {
    fn default() -> Self {
        Self::default_shared()
    }
}

impl Overlap {
    /// A new independent overlap variable. `value` must be in `(0, 1]`.
    pub fn new(value: f64) -> Self {
        assert!(
            value > 0.0 && value <= 1.0,
            "overlap must be in (0, 1], got {value}"
        );
        Self(Variable::new(value))
    }

    /// The shared overlap-1 (contiguous blocks) variable.
    ///
    /// Channels that never state an overlap all share this one cell, so
    /// identity comparison against it answers "is this stream contiguous".
    pub fn one() -> Self {
        OVERLAP_ONE.with(Clone::clone)
    }
}
