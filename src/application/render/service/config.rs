use comrak::options::Options;

pub(crate) fn default_options() -> Options<'static> {
    let mut options = Options::default();
    configure_extensions(&mut options);
    options
}

fn configure_extensions(options: &mut Options<'static>) {
    let ext = &mut options.extension;
    ext.strikethrough = true;
    ext.tagfilter = false;
    ext.table = true;
    ext.autolink = true;
    ext.tasklist = true;
    ext.footnotes = true;
    ext.front_matter_delimiter = Some("---".to_string());

    let render = &mut options.render;
    render.r#unsafe = true;
    render.sourcepos = false;
}

#[cfg(test)]
mod tests {
    use super::default_options;

    #[test]
    fn raw_html_is_allowed() {
        let options = default_options();
        assert!(options.render.r#unsafe);
        assert!(!options.extension.tagfilter);
        assert_eq!(
            options.extension.front_matter_delimiter.as_deref(),
            Some("---")
        );
    }
}
