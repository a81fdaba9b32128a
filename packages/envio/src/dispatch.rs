//! Kind to handler tables, one per direction.

use crate::error::Flow;
use crate::getter::{self, Getter};
use crate::reflect::{Kind, Reflect};
use crate::setter::{self, Setter};

pub(crate) type GetHandler = fn(&mut Getter<'_>, &mut dyn Reflect) -> Flow;
pub(crate) type SetHandler = fn(&mut Setter<'_>, &dyn Reflect) -> Flow;

/// The pair of handlers resolved for one field.
#[derive(Clone, Copy)]
pub(crate) struct Handlers {
    pub get: GetHandler,
    pub set: SetHandler,
}

pub(crate) struct DispatchTable {
    get: [GetHandler; Kind::COUNT],
    set: [SetHandler; Kind::COUNT],
}

/// The process-wide table. Immutable.
pub(crate) static DISPATCH: DispatchTable = DispatchTable::new();

impl DispatchTable {
    // Every slot starts out unsupported, so a kind without an entry can
    // never fall through silently.
    const fn new() -> Self {
        let mut get: [GetHandler; Kind::COUNT] = [getter::unsupported as GetHandler; Kind::COUNT];
        let mut set: [SetHandler; Kind::COUNT] = [setter::unsupported as SetHandler; Kind::COUNT];

        get[Kind::Bool.index()] = getter::boolean;
        get[Kind::Int.index()] = getter::int;
        get[Kind::Uint.index()] = getter::uint;
        get[Kind::Float.index()] = getter::float;
        get[Kind::Bytes.index()] = getter::bytes;
        get[Kind::String.index()] = getter::string;
        get[Kind::Record.index()] = getter::record;
        get[Kind::Optional.index()] = getter::optional;
        get[Kind::Dynamic.index()] = getter::dynamic;

        set[Kind::Bool.index()] = setter::boolean;
        set[Kind::Int.index()] = setter::int;
        set[Kind::Uint.index()] = setter::uint;
        set[Kind::Float.index()] = setter::float;
        set[Kind::Bytes.index()] = setter::bytes;
        set[Kind::String.index()] = setter::string;
        set[Kind::Record.index()] = setter::record;
        set[Kind::Optional.index()] = setter::optional;
        set[Kind::Dynamic.index()] = setter::dynamic;

        DispatchTable { get, set }
    }

    pub(crate) fn getter(&self, kind: Kind) -> GetHandler {
        self.get[kind.index()]
    }

    pub(crate) fn setter(&self, kind: Kind) -> SetHandler {
        self.set[kind.index()]
    }

    pub(crate) fn handlers_for(&self, kind: Kind) -> Handlers {
        Handlers {
            get: self.getter(kind),
            set: self.setter(kind),
        }
    }

    pub(crate) fn unsupported(&self) -> Handlers {
        self.handlers_for(Kind::Unsupported)
    }
}
