fn main() {
    let code = match stagehand_installer::run() {
        Ok(code) => code,
        Err(err) => {
            stagehand_core::style::error(&format!("{:#}", err));
            1
        }
    };
    std::process::exit(code);
}
