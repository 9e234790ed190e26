use crate::{
    error::{PfpError, PfpResult},
    model::{ImageResource, LayerCategory},
};

/// Ordered sets of selectable resources, one per layer category.
///
/// Every non-base category starts with the shared blank sentinel so that the
/// slot can be emptied again after a selection.
#[derive(Clone, Debug)]
pub struct Catalog {
    options: [Vec<ImageResource>; LayerCategory::COUNT],
}

impl Catalog {
    /// The built-in avatar image sets.
    pub fn builtin() -> Self {
        Self {
            options: [
                numbered("layers/base", "Base", 4, false),
                numbered("layers/clothes", "Clothes", 8, true),
                numbered("layers/hat", "Hat", 11, true),
                numbered("layers/accessory", "Accessory 1", 9, true),
                numbered("layers/accessory2", "Accessory 2", 9, true),
            ],
        }
    }

    /// Build a catalog from explicit per-category option lists.
    pub fn from_options(options: [Vec<ImageResource>; LayerCategory::COUNT]) -> PfpResult<Self> {
        let catalog = Self { options };
        catalog.validate()?;
        Ok(catalog)
    }

    /// Ordered selectable resources for one category.
    pub fn options(&self, category: LayerCategory) -> &[ImageResource] {
        &self.options[category.index()]
    }

    /// Whether `resource` is selectable in `category`.
    pub fn contains(&self, category: LayerCategory, resource: &ImageResource) -> bool {
        self.options(category).iter().any(|o| o.source == resource.source)
    }

    /// Default selection: the first base option.
    pub fn default_base(&self) -> PfpResult<ImageResource> {
        self.options(LayerCategory::Base)
            .first()
            .cloned()
            .ok_or_else(|| PfpError::validation("catalog has no base options"))
    }

    pub fn validate(&self) -> PfpResult<()> {
        for category in LayerCategory::ALL {
            let options = self.options(category);
            if options.is_empty() {
                return Err(PfpError::validation(format!(
                    "{} category has no options",
                    category.label()
                )));
            }
            let blank_expected = category != LayerCategory::Base;
            let starts_blank = options[0].is_blank();
            if blank_expected && !starts_blank {
                return Err(PfpError::validation(format!(
                    "{} category must start with the blank sentinel",
                    category.label()
                )));
            }
            if !blank_expected && options.iter().any(ImageResource::is_blank) {
                return Err(PfpError::validation(
                    "base category must not contain the blank sentinel",
                ));
            }
        }
        Ok(())
    }
}

fn numbered(dir: &str, label: &str, count: u32, with_blank: bool) -> Vec<ImageResource> {
    let mut out = Vec::with_capacity(count as usize + usize::from(with_blank));
    if with_blank {
        out.push(ImageResource::blank());
    }
    for i in 1..=count {
        out.push(ImageResource::new(
            format!("{dir}/{i}.png"),
            format!("{label} {i}"),
        ));
    }
    out
}
