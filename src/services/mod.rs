pub(crate) mod rank_service;
pub(crate) mod resolver;
pub(crate) mod runner;
