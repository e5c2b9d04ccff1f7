// src/sites/mod.rs

//! Built-in adapter configurations for the four pharmacy sites.
//!
//! Selectors and bounds come from the sites as observed in production; a
//! TOML config file can override any of them without touching code. The
//! discovery bounds are deliberately generous: catalogs run 4-5K products
//! per site.

use crate::models::{
    ApiHeader, ApiMethod, ApiPagination, BankOfferRules, CategoryRules, CodeSplitRule,
    DiscoveryStrategy, FieldRules, Pharmacy, PrescriptionRule, RuleSource, SiteConfig, SiteRules,
};

/// The four built-in pharmacy adapters.
pub fn default_sites() -> Vec<SiteConfig> {
    vec![
        farma_oliva(),
        punto_farma(),
        farma_center(),
        farmacia_catedral(),
    ]
}

/// WooCommerce-style catalog with classic numbered pagination.
pub fn farma_oliva() -> SiteConfig {
    let base = "https://www.farmaoliva.com.py";
    SiteConfig {
        pharmacy: Pharmacy::FarmaOliva,
        base_url: base.to_string(),
        entry_points: vec![
            format!("{base}/catalogo/medicamentos-c3"),
            format!("{base}/catalogo/suplementos-nutricionales-c5"),
        ],
        product_link_selector: ".product a.ecommercepro-LoopProduct-link".into(),
        product_link_contains: "farmaoliva.com.py".into(),
        site_code_pattern: None,
        wait_selector: "#producto-precio".into(),
        discovery: DiscoveryStrategy::NumberedPagination {
            next_selector: "a.next.page-numbers".into(),
            max_pages: 500,
        },
        max_concurrent: None,
        rules: SiteRules {
            fields: FieldRules {
                product_name: vec![RuleSource::css(".single-product-header h1.product_title")],
                site_code: vec![RuleSource::css("#producto-codigo")],
                barcode: vec![RuleSource::css("#producto-ean")],
                product_description: vec![
                    RuleSource::css(".ecommercepro-product-details__short-description"),
                    RuleSource::css("#tab-1"),
                ],
                // "₲. 59.400 *"
                current_price: vec![RuleSource::css("#producto-precio")],
                original_price: vec![RuleSource::css("#producto-precio-anterior")],
                discount_percentage: vec![RuleSource::css_pattern(".discount text", r"(\d+)%")],
                image_url: vec![
                    RuleSource::css_attr(".ecommercepro-product-gallery__image img", "src"),
                    RuleSource::css_attr(".ecommercepro-product-gallery__image img", "data-src"),
                ],
                ..FieldRules::default()
            },
            category: CategoryRules {
                breadcrumb_selector: Some(".ecommercepro-breadcrumb a".into()),
                home_tokens: vec!["Inicio".into(), "Catálogo de productos".into()],
                ..CategoryRules::default()
            },
            // Badge text such as "Venta libre" or "Venta bajo receta".
            prescription: Some(PrescriptionRule::BadgeFreeToken {
                selector: ".badge-pill".into(),
                free_token: "libre".into(),
            }),
            bank_offer: None,
            code_split: None,
        },
    }
}

/// Next.js storefront; products load behind a "Cargar más" button.
pub fn punto_farma() -> SiteConfig {
    let base = "https://www.puntofarma.com.py";
    SiteConfig {
        pharmacy: Pharmacy::PuntoFarma,
        base_url: base.to_string(),
        entry_points: vec![
            format!("{base}/categoria/1/medicamentos"),
            format!("{base}/categoria/238/nutricion-y-deporte"),
        ],
        product_link_selector: "a[href*='/producto/']".into(),
        product_link_contains: "/producto/".into(),
        site_code_pattern: Some(r"/producto/(\d+)/".into()),
        wait_selector: "h1".into(),
        discovery: DiscoveryStrategy::ClickToLoad {
            // Playwright-flavored selector; interpreted by the page driver.
            button_selector: "button.btn.btn-primary:has-text('Cargar más')".into(),
            max_missing: 3,
            max_clicks: 600,
            pause_ms: 500,
        },
        max_concurrent: None,
        rules: punto_farma_rules(),
    }
}

/// Punto Farma over its internal pagination endpoint: one POST per page
/// against the category URL, no browser needed. Preferred over the
/// click-to-load variant when the endpoint is reachable.
pub fn punto_farma_api() -> SiteConfig {
    let mut site = punto_farma();
    site.entry_points = vec![format!("{}/categoria/1/medicamentos", site.base_url)];
    site.discovery = DiscoveryStrategy::PaginationApi(ApiPagination {
        endpoint: "{entry}".into(),
        method: ApiMethod::Post,
        headers: vec![
            ApiHeader {
                name: "accept".into(),
                value: "text/x-component".into(),
            },
            ApiHeader {
                name: "content-type".into(),
                value: "text/plain;charset=UTF-8".into(),
            },
            ApiHeader {
                name: "next-action".into(),
                value: "48e9f2eca478537e00a58539a9f9edcf2e1dff77".into(),
            },
        ],
        body_template: Some(
            r#"["/productos/categoria/1?p={page}&orderBy=destacado&descuento="]"#.into(),
        ),
        page_size: 20,
        total_pattern: Some(r#""total"\s*:\s*(\d+)"#.into()),
        link_pattern: r"/producto/\d+/[\w-]+".into(),
        max_pages: 500,
    });
    site
}

fn punto_farma_rules() -> SiteRules {
    SiteRules {
        fields: FieldRules {
            product_name: vec![RuleSource::css("h1")],
            // "Código: 139212"
            site_code: vec![RuleSource::css(".codigo span.fw-bold.user-select-all")],
            // The barcode span lacks the bold class the site code carries.
            barcode: vec![RuleSource::css(".codigo span.user-select-all:not(.fw-bold)")],
            brand: vec![RuleSource::css("div > a.category[href*='/marca/']")],
            product_description: vec![RuleSource::css(".atributos_body__wyXR6.accordion-body")],
            current_price: vec![RuleSource::css(".precio-con-descuento span.precio-lg")],
            original_price: vec![RuleSource::css(".precio-regular del.precio-sin-descuento")],
            // "-18% de descuento"
            discount_percentage: vec![RuleSource::css_pattern(
                ".precio-regular div[style*='background-color']",
                r"-?(\d+)%",
            )],
            image_url: vec![RuleSource::css_attr("img[alt*='miniatura']", "src")],
            ..FieldRules::default()
        },
        category: CategoryRules {
            breadcrumb_selector: Some("a.breadcrumb-item".into()),
            ..CategoryRules::default()
        },
        prescription: None,
        // "Con Itau QR Debito *" heading next to the promotional price.
        bank_offer: Some(BankOfferRules {
            name_selector: "h6".into(),
            name_attr: None,
            name_pattern: Some(r"(?i)Con\s+(.+?)(?:\s+\*|$)".into()),
            price_selector: Some(".d-flex span.fs-5".into()),
            percent_selector: None,
        }),
        code_split: None,
    }
}

/// Infinite-scroll catalog; the page embeds its product record as JSON in a
/// hidden input, with schema.org microdata as a second source.
pub fn farma_center() -> SiteConfig {
    let base = "https://www.farmacenter.com.py";
    SiteConfig {
        pharmacy: Pharmacy::FarmaCenter,
        base_url: base.to_string(),
        entry_points: vec![format!("{base}/medicamentos")],
        product_link_selector: "a[href*='/catalogo/']".into(),
        product_link_contains: "/catalogo/".into(),
        site_code_pattern: Some(r"/catalogo/(\d+)-".into()),
        wait_selector: "h1.tit".into(),
        discovery: DiscoveryStrategy::InfiniteScroll {
            max_no_change: 15,
            max_scrolls: 1000,
            pause_ms: 3000,
        },
        max_concurrent: None,
        rules: SiteRules {
            fields: FieldRules {
                product_name: vec![
                    RuleSource::EmbeddedJson {
                        carrier: "input.json".into(),
                        attr: "value".into(),
                        pointer: "/producto/nombre".into(),
                    },
                    RuleSource::Microdata {
                        itemprop: "name".into(),
                    },
                    RuleSource::css("h1.tit"),
                ],
                // Concatenated SKU; the `.cod` hyphen split below overrides it.
                site_code: vec![RuleSource::Microdata {
                    itemprop: "sku".into(),
                }],
                brand: vec![
                    RuleSource::EmbeddedJson {
                        carrier: "input.json".into(),
                        attr: "value".into(),
                        pointer: "/producto/marca".into(),
                    },
                    RuleSource::Microdata {
                        itemprop: "brand".into(),
                    },
                    // data-tit: "Medicamentos ABBOTT"
                    RuleSource::Css {
                        selector: "#central[data-tit]".into(),
                        attr: Some("data-tit".into()),
                        pattern: Some(r"(?i)(?:Medicamentos|Suplementos)\s+(.+)".into()),
                    },
                ],
                product_description: vec![
                    RuleSource::Microdata {
                        itemprop: "description".into(),
                    },
                    RuleSource::css(".desc p"),
                ],
                current_price: vec![RuleSource::css(".precios strong.precio.venta .monto")],
                original_price: vec![RuleSource::css(".precios del.precio.lista .monto")],
                image_url: vec![
                    RuleSource::css_attr("img[alt]", "data-src-g"),
                    RuleSource::css_attr("img[alt]", "src"),
                ],
                ..FieldRules::default()
            },
            category: CategoryRules {
                // "Medicamentos > Vitaminas y minerales > Vitaminas D"
                path_chain: vec![
                    RuleSource::EmbeddedJson {
                        carrier: "input.json".into(),
                        attr: "value".into(),
                        pointer: "/producto/categoria".into(),
                    },
                    RuleSource::Css {
                        selector: "#central[data-tit]".into(),
                        attr: Some("data-tit".into()),
                        pattern: Some(r"^(\w+)".into()),
                    },
                ],
                ..CategoryRules::default()
            },
            prescription: None,
            bank_offer: None,
            code_split: Some(CodeSplitRule {
                selector: ".cod".into(),
                separator: "-".into(),
            }),
        },
    }
}

/// Infinite-scroll catalog with proper JSON-LD on product pages.
pub fn farmacia_catedral() -> SiteConfig {
    let base = "https://www.farmaciacatedral.com.py";
    SiteConfig {
        pharmacy: Pharmacy::FarmaciaCatedral,
        base_url: base.to_string(),
        entry_points: vec![format!(
            "{base}/categoria/1/medicamentos?marcas=&categorias=&categorias_top=1"
        )],
        product_link_selector: "a[href*='/producto/']".into(),
        product_link_contains: "/producto/".into(),
        site_code_pattern: Some(r"/producto/(\d+)/".into()),
        wait_selector: "h1.title-ficha".into(),
        discovery: DiscoveryStrategy::InfiniteScroll {
            max_no_change: 15,
            max_scrolls: 1000,
            pause_ms: 3000,
        },
        max_concurrent: None,
        rules: SiteRules {
            fields: FieldRules {
                product_name: vec![
                    RuleSource::JsonLd {
                        pointer: "/name".into(),
                    },
                    RuleSource::css("h1.title-ficha"),
                ],
                site_code: vec![
                    RuleSource::JsonLd {
                        pointer: "/sku".into(),
                    },
                    // "CÓD.: 66"
                    RuleSource::css_pattern(".codigo-ficha", r"CÓD\.:?\s*(.+)"),
                ],
                // "CÓD. BARRAS: 7840036005616"
                barcode: vec![RuleSource::css_pattern(
                    ".barra-ficha",
                    r"CÓD\.\s*BARRAS:?\s*(.+)",
                )],
                brand: vec![
                    RuleSource::JsonLd {
                        pointer: "/brand/name".into(),
                    },
                    RuleSource::css("a.title-marca"),
                ],
                // Full description tab, then the summary tab, each minus its
                // heading, then the JSON-LD description.
                product_description: vec![
                    RuleSource::css_pattern(
                        "#home-tab-pane",
                        r"(?si)^(?:Descripción del producto\s*)?(.+)",
                    ),
                    RuleSource::css_pattern(
                        "#profile-tab-pane",
                        r"(?si)^(?:Resumen del producto\s*)?(.+)",
                    ),
                    RuleSource::JsonLd {
                        pointer: "/description".into(),
                    },
                ],
                // "Gs. 74.950 <span>Gs. 149.900</span>": first amount is the
                // web price, the nested span holds the list price.
                current_price: vec![
                    RuleSource::css_pattern(".precio-web", r"Gs\.\s*([\d.,]+)"),
                    RuleSource::JsonLd {
                        pointer: "/offers/price".into(),
                    },
                ],
                original_price: vec![RuleSource::css(".precio-web span")],
                discount_percentage: vec![RuleSource::css_pattern(".tag-descuentos", r"-?(\d+)%")],
                image_url: vec![RuleSource::JsonLd {
                    pointer: "/image/0".into(),
                }],
                ..FieldRules::default()
            },
            category: CategoryRules {
                breadcrumb_selector: Some("ol.breadcrumb a.breadcrumb-item".into()),
                home_tokens: vec!["Inicio".into()],
                ..CategoryRules::default()
            },
            prescription: Some(PrescriptionRule::AlertKeyword {
                selector: ".alert.alert-warning".into(),
                keyword: "receta".into(),
                label: "Receta médica obligatoria".into(),
            }),
            // "Logo de Cooperativa Universitaria" image alt plus a list of
            // "30% en Web/Sucursal." / "Gs. 31.500" lines.
            bank_offer: Some(BankOfferRules {
                name_selector: ".title-itau img".into(),
                name_attr: Some("alt".into()),
                name_pattern: Some(r"Logo de (.+)".into()),
                price_selector: Some(".list-itau li".into()),
                percent_selector: Some(".list-itau li".into()),
            }),
            code_split: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Pharmacy;

    #[test]
    fn builtins_cover_every_pharmacy() {
        let sites = default_sites();
        assert_eq!(sites.len(), Pharmacy::ALL.len());
        for pharmacy in Pharmacy::ALL {
            assert!(sites.iter().any(|s| s.pharmacy == pharmacy));
        }
    }

    #[test]
    fn builtins_validate() {
        for site in default_sites() {
            site.validate().unwrap();
        }
        punto_farma_api().validate().unwrap();
    }

    #[test]
    fn api_variant_posts_to_the_category_page() {
        let site = punto_farma_api();
        match site.discovery {
            DiscoveryStrategy::PaginationApi(api) => {
                assert_eq!(api.method, ApiMethod::Post);
                assert!(api.body_template.unwrap().contains("{page}"));
            }
            other => panic!("unexpected strategy: {other:?}"),
        }
    }
}
