use keyhive::{Registry, RootScope, Settings, TomlFileProvider};

fn main() -> Result<(), keyhive::Error> {
    // Settings file is optional; KEYHIVE__SCOPE etc. override it.
    let settings = Settings::builder()
        .with_file("demos/keyhive.toml", false)
        .with_env("KEYHIVE", "__")
        .build()?;

    let store = settings
        .store_file
        .clone()
        .unwrap_or_else(|| std::env::temp_dir().join("keyhive-demo.toml"));

    let registry = Registry::builder()
        .with_settings(&settings)
        .with_provider(TomlFileProvider::open(&store)?)
        .build()?;

    // Created on first run, read back afterwards.
    let theme = registry.get_value("Software\\Demo  Tool", "Theme", "dark", true)?;
    let beta = registry.get_bool("Software\\Demo Tool", "Beta", "False", true)?;
    registry.set_value("Software\\Demo Tool\\Window", "Width", 1280u32)?;

    println!("store: {}", store.display());
    println!("Theme = {theme:?}, Beta = {beta:?}");
    println!(
        "children of Software: {:?}",
        registry.child_names("Software", RootScope::CurrentUser)?
    );

    Ok(())
}
