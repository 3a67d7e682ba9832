pub(crate) mod blend;
pub(crate) mod model;
pub(crate) mod transform;
