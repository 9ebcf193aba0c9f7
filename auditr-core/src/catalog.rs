//! RGAA 4.1 criteria reference and its mapping to axe-core rule ids.

use std::collections::HashMap;
use std::fmt;

use auditr_model::{ConformanceLevel, CriterionOutcome, CriterionResult};
use once_cell::sync::Lazy;

/// RGAA thematic grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Theme {
    /// Images.
    Images,
    /// Frames.
    Frames,
    /// Colours.
    Colors,
    /// Multimedia.
    Multimedia,
    /// Data tables.
    Tables,
    /// Links.
    Links,
    /// Scripts.
    Scripts,
    /// Mandatory elements.
    MandatoryElements,
    /// Structuring of information.
    Structure,
    /// Presentation of information.
    Presentation,
    /// Forms.
    Forms,
    /// Navigation.
    Navigation,
    /// Consultation.
    Consultation,
}

impl Theme {
    /// Display name used in criterion results.
    pub fn label(self) -> &'static str {
        match self {
            Theme::Images => "Images",
            Theme::Frames => "Frames",
            Theme::Colors => "Colors",
            Theme::Multimedia => "Multimedia",
            Theme::Tables => "Tables",
            Theme::Links => "Links",
            Theme::Scripts => "Scripts",
            Theme::MandatoryElements => "Mandatory elements",
            Theme::Structure => "Structure",
            Theme::Presentation => "Presentation",
            Theme::Forms => "Forms",
            Theme::Navigation => "Navigation",
            Theme::Consultation => "Consultation",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A static catalog row.
#[derive(Debug, Clone, Copy)]
pub struct RgaaCriterion {
    /// RGAA number such as `"1.1"`.
    pub id: &'static str,
    /// Thematic group.
    pub theme: Theme,
    /// Conformance level.
    pub level: ConformanceLevel,
    /// Criterion wording.
    pub title: &'static str,
    /// axe-core rule ids that map onto this criterion.
    pub rules: &'static [&'static str],
}

impl RgaaCriterion {
    fn to_result(self) -> CriterionResult {
        CriterionResult {
            id: self.id.to_string(),
            theme: self.theme.label().to_string(),
            title: self.title.to_string(),
            level: self.level,
            result: CriterionOutcome::Untested,
            details: Vec::new(),
            rule_ids: self.rules.iter().map(|rule| rule.to_string()).collect(),
        }
    }
}

macro_rules! rgaa {
    ($($id:literal $theme:ident $level:ident $title:literal [$($rule:literal),* $(,)?];)*) => {
        &[$(RgaaCriterion {
            id: $id,
            theme: Theme::$theme,
            level: ConformanceLevel::$level,
            title: $title,
            rules: &[$($rule),*],
        },)*]
    };
}

/// The RGAA 4.1 criteria, in reference order.
pub static RGAA_CRITERIA: &[RgaaCriterion] = rgaa! {
    "1.1" Images A "Each informative image has a text alternative"
        ["image-alt", "input-image-alt", "area-alt", "role-img-alt", "svg-img-alt", "object-alt"];
    "1.2" Images A "Each decorative image is ignored by assistive technologies"
        ["presentation-role-conflict"];
    "1.3" Images A "Each informative image's text alternative is relevant"
        ["image-redundant-alt"];
    "1.4" Images A "Each CAPTCHA or test image's alternative identifies its nature and purpose" [];
    "1.5" Images A "Each CAPTCHA offers an alternative access method" [];
    "1.6" Images A "Each informative image has a detailed description when needed" [];
    "1.7" Images A "Each detailed description of an informative image is relevant" [];
    "1.8" Images AA "Each text image carrying information is replaced by styled text" [];
    "1.9" Images A "Each image caption is correctly associated with its image" [];

    "2.1" Frames A "Each frame has a title" ["frame-title"];
    "2.2" Frames A "Each frame title is relevant" ["frame-title-unique"];

    "3.1" Colors A "Information is never conveyed by color alone" ["link-in-text-block"];
    "3.2" Colors AA "Contrast between text and background is sufficient" ["color-contrast"];
    "3.3" Colors AA "Contrast of interface components and graphics is sufficient" [];

    "4.1" Multimedia A "Prerecorded time-based media has a transcript or audio description" [];
    "4.2" Multimedia A "Transcripts and audio descriptions of time-based media are relevant" [];
    "4.3" Multimedia A "Prerecorded synchronized media has synchronized captions" ["video-caption"];
    "4.4" Multimedia A "Synchronized captions are relevant" [];
    "4.5" Multimedia AA "Prerecorded media has a synchronized audio description" [];
    "4.6" Multimedia AA "Synchronized audio descriptions are relevant" [];
    "4.7" Multimedia A "Each time-based media is clearly identifiable" [];
    "4.8" Multimedia A "Each non-time-based media has an alternative" ["object-alt"];
    "4.9" Multimedia A "Each non-time-based media alternative is relevant" [];
    "4.10" Multimedia A "Automatically triggered sound can be controlled" ["no-autoplay-audio"];
    "4.11" Multimedia A "Time-based media can be controlled by keyboard and pointer" [];
    "4.12" Multimedia A "Non-time-based media can be controlled by keyboard and pointer" [];
    "4.13" Multimedia A "Media is compatible with assistive technologies" [];

    "5.1" Tables A "Each complex data table has a summary" [];
    "5.2" Tables A "Each complex data table summary is relevant" [];
    "5.3" Tables A "Each layout table linearizes into understandable content" [];
    "5.4" Tables A "Each data table title is correctly associated with the table" [];
    "5.5" Tables A "Each data table title is relevant" [];
    "5.6" Tables A "Each data table declares its row and column headers"
        ["th-has-data-cells", "empty-table-header"];
    "5.7" Tables A "Data cells are associated with their headers with an appropriate technique"
        ["td-headers-attr", "td-has-header", "scope-attr-valid"];
    "5.8" Tables A "Layout tables do not use data table elements" [];

    "6.1" Links A "Each link is explicit" ["identical-links-same-purpose", "link-name"];
    "6.2" Links A "Each link has an accessible name" ["link-name"];

    "7.1" Scripts A "Each script is compatible with assistive technologies"
        [
            "aria-allowed-attr", "aria-allowed-role", "aria-command-name",
            "aria-required-attr", "aria-required-children", "aria-required-parent",
            "aria-roles", "aria-toggle-field-name", "aria-valid-attr",
            "aria-valid-attr-value", "button-name", "nested-interactive",
        ];
    "7.2" Scripts A "Each script with an alternative offers a relevant one" [];
    "7.3" Scripts A "Each script can be controlled by keyboard and pointer"
        ["scrollable-region-focusable", "frame-focusable-content"];
    "7.4" Scripts A "Context changes triggered by scripts are announced or controlled" [];
    "7.5" Scripts AA "Status messages are rendered correctly by assistive technologies" [];

    "8.1" MandatoryElements A "Each page declares a document type" [];
    "8.2" MandatoryElements A "Each page has valid source code" ["duplicate-id-aria", "duplicate-id-active"];
    "8.3" MandatoryElements A "Each page declares a default language" ["html-has-lang"];
    "8.4" MandatoryElements A "The default language code is valid and relevant"
        ["html-lang-valid", "html-xml-lang-mismatch"];
    "8.5" MandatoryElements A "Each page has a title" ["document-title"];
    "8.6" MandatoryElements A "Each page title is relevant" [];
    "8.7" MandatoryElements AA "Each change of language is indicated in the source code" ["valid-lang"];
    "8.8" MandatoryElements AA "Each change of language code is valid and relevant" ["valid-lang"];
    "8.9" MandatoryElements A "Tags are not used for presentation only" [];
    "8.10" MandatoryElements A "Changes of reading direction are indicated" [];

    "9.1" Structure A "Information is structured with appropriate headings"
        ["heading-order", "page-has-heading-one", "empty-heading"];
    "9.2" Structure A "The document outline is coherent"
        [
            "landmark-one-main", "landmark-no-duplicate-main", "landmark-no-duplicate-banner",
            "landmark-no-duplicate-contentinfo", "landmark-unique", "landmark-main-is-top-level",
            "landmark-banner-is-top-level", "landmark-contentinfo-is-top-level",
            "landmark-complementary-is-top-level",
        ];
    "9.3" Structure A "Each list is correctly structured" ["list", "listitem", "definition-list", "dlitem"];
    "9.4" Structure A "Each quotation is correctly marked up" [];

    "10.1" Presentation A "Style sheets are used to control presentation" ["presentation-role-conflict"];
    "10.2" Presentation A "Visible content stays present when style sheets are disabled" [];
    "10.3" Presentation A "Information stays understandable when style sheets are disabled" [];
    "10.4" Presentation AA "Text stays readable when zoomed to 200%" ["meta-viewport", "meta-viewport-large"];
    "10.5" Presentation AA "Text and background color declarations are used correctly" [];
    "10.6" Presentation A "Each link inside text is visually distinguishable" ["link-in-text-block"];
    "10.7" Presentation A "Focus is visible on each focusable element" [];
    "10.8" Presentation A "Hidden content is ignored by assistive technologies"
        ["aria-hidden-body", "aria-hidden-focus"];
    "10.9" Presentation A "Information is not conveyed by shape, size or position alone" [];
    "10.10" Presentation A "Information conveyed by shape, size or position is rendered correctly" [];
    "10.11" Presentation AA "Content reflows without horizontal scrolling at 320px" [];
    "10.12" Presentation AA "Text spacing can be overridden without loss of content" ["avoid-inline-spacing"];
    "10.13" Presentation AA "Additional content shown on hover or focus is controllable" [];
    "10.14" Presentation A "Content shown through style sheets is reachable by keyboard" [];

    "11.1" Forms A "Each form field has a label"
        ["label", "select-name", "aria-input-field-name", "form-field-multiple-labels"];
    "11.2" Forms A "Each form field label is relevant" ["label-title-only", "label-content-name-mismatch"];
    "11.3" Forms AA "Labels of fields with the same function are consistent" [];
    "11.4" Forms A "Each label and its field are adjacent" [];
    "11.5" Forms A "Related fields are grouped" [];
    "11.6" Forms A "Each group of related fields has a legend" [];
    "11.7" Forms A "Each grouping legend is relevant" [];
    "11.8" Forms A "Related items of a selection list are grouped" [];
    "11.9" Forms A "Each button label is relevant" ["button-name", "input-button-name"];
    "11.10" Forms A "Input control is used relevantly" [];
    "11.11" Forms AA "Input errors come with correction suggestions" [];
    "11.12" Forms AA "Legal, financial or personal data entries can be reviewed or reversed" [];
    "11.13" Forms AA "The purpose of a field can be inferred to ease autofill" ["autocomplete-valid"];

    "12.1" Navigation AA "Each set of pages has at least two navigation systems" [];
    "12.2" Navigation AA "Menus and navigation bars are consistent across pages" [];
    "12.3" Navigation AA "The site map page is relevant" [];
    "12.4" Navigation AA "The site map page is reachable the same way everywhere" [];
    "12.5" Navigation AA "The search engine is reachable the same way everywhere" [];
    "12.6" Navigation A "Content regions can be reached or skipped" ["bypass", "region"];
    "12.7" Navigation A "A skip link or quick access link to main content is present" ["bypass", "skip-link"];
    "12.8" Navigation A "Tab order is coherent" ["tabindex"];
    "12.9" Navigation A "Navigation does not contain keyboard traps" [];
    "12.10" Navigation A "Single-key shortcuts can be controlled" ["accesskeys"];
    "12.11" Navigation AA "Additional content shown on hover, focus or activation is keyboard reachable" [];

    "13.1" Consultation A "Users can control each time limit"
        ["meta-refresh", "meta-refresh-no-exceptions"];
    "13.2" Consultation A "Opening a new window is not triggered without user action" [];
    "13.3" Consultation A "Each downloadable office document has an accessible version" [];
    "13.4" Consultation A "Each accessible version of a document offers the same information" [];
    "13.5" Consultation A "Each cryptic content has an alternative" [];
    "13.6" Consultation A "Each cryptic content alternative is relevant" [];
    "13.7" Consultation A "Flashing and flickering content is used correctly" ["blink", "marquee"];
    "13.8" Consultation A "Moving or blinking content can be controlled" ["blink", "marquee"];
    "13.9" Consultation AA "Content is viewable in any screen orientation" ["css-orientation-lock"];
    "13.10" Consultation A "Complex gestures have a simple alternative" [];
    "13.11" Consultation A "Pointer actions can be cancelled" [];
    "13.12" Consultation A "Motion-triggered features have an alternative" [];
};

/// An ordered criteria list with a rule id index.
#[derive(Debug, Clone)]
pub struct Catalog {
    entries: Vec<CriterionResult>,
    by_rule: HashMap<String, Vec<usize>>,
}

impl Catalog {
    /// Index `entries` by the rule ids they list.
    pub fn new(entries: Vec<CriterionResult>) -> Self {
        let mut by_rule: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, entry) in entries.iter().enumerate() {
            for rule in &entry.rule_ids {
                let slots = by_rule.entry(rule.clone()).or_default();
                if !slots.contains(&idx) {
                    slots.push(idx);
                }
            }
        }
        Self { entries, by_rule }
    }

    /// The built-in RGAA 4.1 catalog.
    pub fn rgaa() -> Self {
        Self::new(RGAA_CRITERIA.iter().map(|c| c.to_result()).collect())
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Criteria in catalog order.
    pub fn entries(&self) -> &[CriterionResult] {
        &self.entries
    }

    /// Every criterion reset to `untested`, as stored on a new audit.
    pub fn initial_results(&self) -> Vec<CriterionResult> {
        self.entries
            .iter()
            .cloned()
            .map(|mut entry| {
                entry.result = CriterionOutcome::Untested;
                entry.details.clear();
                entry
            })
            .collect()
    }

    /// Criteria that list `rule_id`, in catalog order.
    pub fn criteria_for_rule<'a>(
        &'a self,
        rule_id: &str,
    ) -> impl Iterator<Item = &'a CriterionResult> + use<'a> {
        self.by_rule
            .get(rule_id)
            .into_iter()
            .flatten()
            .map(|idx| &self.entries[*idx])
    }
}

impl Default for Catalog {
    fn default() -> Self {
        RGAA.clone()
    }
}

/// Shared RGAA catalog, built on first use.
pub static RGAA: Lazy<Catalog> = Lazy::new(Catalog::rgaa);

/// RGAA criteria subsuming an axe-core rule.
pub fn criteria_for_rule(rule_id: &str) -> Vec<&'static CriterionResult> {
    RGAA.criteria_for_rule(rule_id).collect()
}
