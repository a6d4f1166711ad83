pub(crate) mod expand;
pub(crate) mod row;
pub(crate) mod table;
