mod repo;

pub(crate) mod model;

pub(crate) use repo::AccountRepo;
