use std::path::PathBuf;

xflags::xflags! {
    /// Moderation filter for inbound ActivityPub traffic.
    cmd mrf {
        /// TOML configuration file
        optional -c, --config path: PathBuf

        /// Accept activities over HTTP and moderate them.
        default cmd serve {}

        /// Moderate one activity read from a JSON file and print the verdict.
        cmd check {
            required file: PathBuf
        }

        /// Load remote accounts from a JSON array into the local store.
        cmd import-accounts {
            required file: PathBuf
        }
    }
}
