//! 类型擦除后的请求信封
//!
//! 管线行为不感知具体请求类型，只看到名称、种类与擦除后的载荷。
use crate::{command::Command, query::Query};
use std::any::{Any, TypeId};
use std::fmt;

pub type BoxAnySend = Box<dyn Any + Send>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Command,
    Query,
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestKind::Command => f.write_str("command"),
            RequestKind::Query => f.write_str("query"),
        }
    }
}

pub struct RequestEnvelope {
    name: &'static str,
    kind: RequestKind,
    type_id: TypeId,
    payload: BoxAnySend,
}

impl RequestEnvelope {
    pub fn command<C: Command>(cmd: C) -> Self {
        Self {
            name: C::NAME,
            kind: RequestKind::Command,
            type_id: TypeId::of::<C>(),
            payload: Box::new(cmd),
        }
    }

    pub fn query<Q: Query>(q: Q) -> Self {
        Self {
            name: Q::NAME,
            kind: RequestKind::Query,
            type_id: TypeId::of::<Q>(),
            payload: Box::new(q),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> RequestKind {
        self.kind
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.payload.downcast_ref::<T>()
    }

    pub(crate) fn payload(&self) -> &(dyn Any + Send) {
        self.payload.as_ref()
    }

    pub fn into_payload(self) -> BoxAnySend {
        self.payload
    }
}

impl fmt::Debug for RequestEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestEnvelope")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}
