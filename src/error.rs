//! Process-wide error reporting

/// Initialize error handling for the application
pub fn install_error_handlers() -> color_eyre::Result<()> {
    color_eyre::install()?;

    // color-eyre installs its own hook; log panics through tracing as well
    let report_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        if let Some(location) = panic_info.location() {
            tracing::error!(
                message = %panic_info,
                panic.file = location.file(),
                panic.line = location.line(),
                panic.column = location.column(),
                "Application panic"
            );
        } else {
            tracing::error!(message = %panic_info, "Application panic");
        }

        // If in test environment, don't print the panic (test frameworks handle this)
        if std::env::var_os("RUST_TEST").is_some() {
            return;
        }

        eprintln!("💥 graytail panicked! This is a bug and should be reported.");
        report_hook(panic_info);
    }));

    Ok(())
}
