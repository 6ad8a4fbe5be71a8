//! Tests for logger verbosity selection and installation

#[cfg(test)]
mod tests {
    use neuroconn::io::logger::{default_directive, init_cli_logger};

    #[test]
    fn test_default_directive() {
        assert_eq!(default_directive(false, false), "neuroconn=info");
        assert_eq!(default_directive(true, false), "neuroconn=debug,info");
        assert_eq!(default_directive(false, true), "neuroconn=warn");
        // Quiet wins over verbose
        assert_eq!(default_directive(true, true), "neuroconn=warn");
    }

    // Tests a second installation is refused instead of panicking
    #[test]
    fn test_init_only_once() {
        let _ = init_cli_logger(false, true);
        assert!(!init_cli_logger(true, false));
    }
}
