use thumbforge::{
    FontLibrary, FsImageLoader, RenderSurface, ThumbnailRenderer, ThumbnailState, encode_jpeg,
};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let mut fonts = FontLibrary::new();
    let loaded = fonts.load_fonts_dir(std::path::Path::new("fonts"))?;
    if let Some(first) = loaded.first() {
        fonts.set_fallback_family(first)?;
        eprintln!("registered fonts: {}", loaded.join(", "));
    }

    let mut state = ThumbnailState::default();
    if loaded.is_empty() {
        eprintln!("no fonts/ directory found; rendering the background only");
        state.title.clear();
        state.subtitle.clear();
    }

    let mut renderer = ThumbnailRenderer::new(fonts);
    let mut surface = RenderSurface::new(1.0)?;
    let mut images = FsImageLoader::new(".");
    renderer.render(&mut surface, &state, &mut images)?;

    std::fs::create_dir_all("target")?;
    let out_path = std::path::Path::new("target").join(format!("{}.jpg", state.export_file_stem()));
    std::fs::write(&out_path, encode_jpeg(&surface)?)?;

    eprintln!("wrote {}", out_path.display());
    Ok(())
}
