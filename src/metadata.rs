pub(crate) mod bag;
pub(crate) mod resolver;
pub(crate) mod timestamp;
