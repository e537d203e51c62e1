mod account_repo;

pub(crate) use account_repo::AccountRepo;
