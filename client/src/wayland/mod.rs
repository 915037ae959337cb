use std::{fmt, num::NonZeroU32};

use crate::Error;

pub mod connection;
pub mod interfaces;
pub mod wire;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId(NonZeroU32);

impl ObjectId {
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0.get()
    }

    #[must_use]
    pub const fn new(value: NonZeroU32) -> Self {
        Self(value)
    }

    /// `None` is the null object
    #[must_use]
    pub const fn from_raw(value: u32) -> Option<Self> {
        match NonZeroU32::new(value) {
            Some(value) => Some(Self(value)),
            None => None,
        }
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// The display is the only object that exists before we create anything
pub const WL_DISPLAY: ObjectId = ObjectId(NonZeroU32::MIN);

/// Every interface we know how to talk to
///
/// Each one has exactly one slot in the [`ObjectManager`], holding the most recent object of that
/// interface we created.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WlDynObj {
    Display,
    Registry,
    Shm,
    ShmPool,
    Buffer,
    Compositor,
    Surface,
    Output,
    WmBase,
    XdgSurface,
    Toplevel,
    Callback,
}

impl WlDynObj {
    const COUNT: usize = 12;

    #[must_use]
    pub const fn interface(&self) -> &'static str {
        match self {
            Self::Display => "wl_display",
            Self::Registry => "wl_registry",
            Self::Shm => "wl_shm",
            Self::ShmPool => "wl_shm_pool",
            Self::Buffer => "wl_buffer",
            Self::Compositor => "wl_compositor",
            Self::Surface => "wl_surface",
            Self::Output => "wl_output",
            Self::WmBase => "xdg_wm_base",
            Self::XdgSurface => "xdg_surface",
            Self::Toplevel => "xdg_toplevel",
            Self::Callback => "wl_callback",
        }
    }
}

/// Hands out object ids and remembers what each of them is
///
/// Ids are never reused: the counter only goes up, even after the compositor acknowledges an
/// object's destruction with `wl_display.delete_id`.
#[derive(Debug)]
pub struct ObjectManager {
    /// `objects[i]` describes id `i + 1`. `None` for ids that were allocated but never bound, or
    /// that have been deleted
    objects: Vec<Option<WlDynObj>>,
    slots: [Option<ObjectId>; WlDynObj::COUNT],
}

impl Default for ObjectManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectManager {
    #[must_use]
    pub fn new() -> Self {
        let mut slots = [None; WlDynObj::COUNT];
        slots[WlDynObj::Display as usize] = Some(WL_DISPLAY);
        Self {
            objects: vec![Some(WlDynObj::Display)],
            slots,
        }
    }

    /// creates a new Id to use in requests
    #[must_use]
    pub fn allocate_id(&mut self) -> ObjectId {
        let id = NonZeroU32::MIN.saturating_add(self.objects.len() as u32);
        self.objects.push(None);
        ObjectId(id)
    }

    /// Records `id` as the current object of `object`'s interface
    pub fn bind_slot(&mut self, object: WlDynObj, id: ObjectId) {
        if let Some(entry) = self.objects.get_mut(id.get() as usize - 1) {
            *entry = Some(object);
        }
        self.slots[object as usize] = Some(id);
    }

    /// Allocates an id for a new `object` and puts it in its slot
    #[must_use]
    pub fn bind(&mut self, object: WlDynObj) -> ObjectId {
        let id = self.allocate_id();
        self.bind_slot(object, id);
        id
    }

    /// The current object of this interface, if we have one
    #[must_use]
    pub fn get(&self, object: WlDynObj) -> Option<ObjectId> {
        self.slots[object as usize]
    }

    /// Like [`Self::get`], for requests that cannot be sent without the object
    pub fn require(&self, object: WlDynObj) -> Result<ObjectId, Error> {
        self.get(object)
            .ok_or_else(|| Error::Unbound(object.interface()))
    }

    /// What `id` was created as, if it is still alive
    #[must_use]
    pub fn lookup(&self, id: ObjectId) -> Option<WlDynObj> {
        self.objects.get(id.get() as usize - 1).copied().flatten()
    }

    /// Like [`Self::lookup`], but only if `id` is also the one in its interface's slot
    #[must_use]
    pub fn current(&self, id: ObjectId) -> Option<WlDynObj> {
        self.lookup(id).filter(|object| self.get(*object) == Some(id))
    }

    /// Forgets what `id` was. The id itself is not handed out again
    pub fn remove(&mut self, id: ObjectId) {
        if let Some(entry) = self.objects.get_mut(id.get() as usize - 1) {
            *entry = None;
        }
    }
}
