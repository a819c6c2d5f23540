//! Static product catalogue served by the mock datasource.

/// A product row of the mock catalogue.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Product {
    pub id: &'static str,
    pub label: &'static str,
    pub sku: &'static str,
    pub price: f64,
    pub stock: u32,
}

const fn product(
    id: &'static str,
    label: &'static str,
    sku: &'static str,
    price: f64,
    stock: u32,
) -> Product {
    Product {
        id,
        label,
        sku,
        price,
        stock,
    }
}

/// The full catalogue, ordered by id.
pub static MOCK_PRODUCTS: &[Product] = &[
    product("prod-001", "Widget A", "WDG-A-001", 99.99, 150),
    product("prod-002", "Widget B", "WDG-B-002", 149.99, 75),
    product("prod-003", "Widget C", "WDG-C-003", 199.99, 120),
    product("prod-004", "Widget D", "WDG-D-004", 89.99, 200),
    product("prod-005", "Widget E", "WDG-E-005", 129.99, 95),
    product("prod-006", "Widget F", "WDG-F-006", 159.99, 110),
    product("prod-007", "Widget G", "WDG-G-007", 179.99, 85),
    product("prod-008", "Widget H", "WDG-H-008", 139.99, 140),
    product("prod-009", "Widget I", "WDG-I-009", 109.99, 165),
    product("prod-010", "Widget J", "WDG-J-010", 119.99, 180),
    product("prod-011", "Widget K", "WDG-K-011", 94.99, 155),
    product("prod-012", "Widget L", "WDG-L-012", 104.99, 125),
    product("prod-013", "Widget M", "WDG-M-013", 114.99, 145),
    product("prod-014", "Widget N", "WDG-N-014", 124.99, 135),
    product("prod-015", "Widget O", "WDG-O-015", 134.99, 115),
    product("prod-016", "Widget P", "WDG-P-016", 144.99, 105),
    product("prod-017", "Widget Q", "WDG-Q-017", 154.99, 95),
    product("prod-018", "Widget R", "WDG-R-018", 164.99, 85),
    product("prod-019", "Widget S", "WDG-S-019", 174.99, 175),
    product("prod-020", "Widget T", "WDG-T-020", 184.99, 165),
    product("prod-021", "Widget U", "WDG-U-021", 194.99, 155),
    product("prod-022", "Widget V", "WDG-V-022", 79.99, 145),
    product("prod-023", "Widget W", "WDG-W-023", 69.99, 135),
    product("prod-024", "Widget X", "WDG-X-024", 59.99, 125),
    product("prod-025", "Widget Y", "WDG-Y-025", 49.99, 115),
    product("prod-026", "Widget Z", "WDG-Z-026", 209.99, 105),
    product("prod-027", "Widget AA", "WDG-AA-027", 219.99, 95),
    product("prod-028", "Widget AB", "WDG-AB-028", 229.99, 185),
    product("prod-029", "Widget AC", "WDG-AC-029", 239.99, 175),
    product("prod-030", "Widget AD", "WDG-AD-030", 249.99, 165),
    product("prod-031", "Widget AE", "WDG-AE-031", 259.99, 155),
    product("prod-032", "Widget AF", "WDG-AF-032", 269.99, 145),
    product("prod-033", "Widget AG", "WDG-AG-033", 279.99, 135),
    product("prod-034", "Widget AH", "WDG-AH-034", 289.99, 125),
    product("prod-035", "Widget AI", "WDG-AI-035", 299.99, 115),
    product("prod-036", "Widget AJ", "WDG-AJ-036", 84.99, 190),
    product("prod-037", "Widget AK", "WDG-AK-037", 74.99, 170),
    product("prod-038", "Widget AL", "WDG-AL-038", 64.99, 160),
    product("prod-039", "Widget AM", "WDG-AM-039", 54.99, 150),
    product("prod-040", "Widget AN", "WDG-AN-040", 44.99, 140),
    product("prod-041", "Widget AO", "WDG-AO-041", 189.99, 130),
    product("prod-042", "Widget AP", "WDG-AP-042", 169.99, 120),
    product("prod-043", "Widget AQ", "WDG-AQ-043", 159.99, 110),
    product("prod-044", "Widget AR", "WDG-AR-044", 149.99, 100),
    product("prod-045", "Widget AS", "WDG-AS-045", 139.99, 90),
    product("prod-046", "Widget AT", "WDG-AT-046", 129.99, 195),
    product("prod-047", "Widget AU", "WDG-AU-047", 119.99, 185),
    product("prod-048", "Widget AV", "WDG-AV-048", 109.99, 175),
    product("prod-049", "Widget AW", "WDG-AW-049", 99.99, 165),
    product("prod-050", "Widget AX", "WDG-AX-050", 89.99, 155),
    product("prod-051", "Gadget A", "GDG-A-051", 299.99, 80),
    product("prod-052", "Gadget B", "GDG-B-052", 349.99, 65),
    product("prod-053", "Gadget C", "GDG-C-053", 399.99, 90),
    product("prod-054", "Gadget D", "GDG-D-054", 449.99, 55),
    product("prod-055", "Gadget E", "GDG-E-055", 499.99, 70),
    product("prod-056", "Gadget F", "GDG-F-056", 549.99, 45),
    product("prod-057", "Gadget G", "GDG-G-057", 599.99, 60),
    product("prod-058", "Gadget H", "GDG-H-058", 649.99, 35),
    product("prod-059", "Gadget I", "GDG-I-059", 699.99, 50),
    product("prod-060", "Gadget J", "GDG-J-060", 749.99, 25),
    product("prod-061", "Gadget K", "GDG-K-061", 799.99, 40),
    product("prod-062", "Gadget L", "GDG-L-062", 849.99, 30),
    product("prod-063", "Gadget M", "GDG-M-063", 899.99, 20),
    product("prod-064", "Gadget N", "GDG-N-064", 949.99, 15),
    product("prod-065", "Gadget O", "GDG-O-065", 999.99, 10),
    product("prod-066", "Gadget P", "GDG-P-066", 319.99, 85),
    product("prod-067", "Gadget Q", "GDG-Q-067", 369.99, 75),
    product("prod-068", "Gadget R", "GDG-R-068", 419.99, 95),
    product("prod-069", "Gadget S", "GDG-S-069", 469.99, 100),
    product("prod-070", "Gadget T", "GDG-T-070", 519.99, 65),
    product("prod-071", "Tool A", "TL-A-071", 39.99, 250),
    product("prod-072", "Tool B", "TL-B-072", 49.99, 230),
    product("prod-073", "Tool C", "TL-C-073", 59.99, 210),
    product("prod-074", "Tool D", "TL-D-074", 69.99, 190),
    product("prod-075", "Tool E", "TL-E-075", 79.99, 270),
    product("prod-076", "Tool F", "TL-F-076", 89.99, 240),
    product("prod-077", "Tool G", "TL-G-077", 99.99, 220),
    product("prod-078", "Tool H", "TL-H-078", 109.99, 200),
    product("prod-079", "Tool I", "TL-I-079", 119.99, 180),
    product("prod-080", "Tool J", "TL-J-080", 129.99, 260),
    product("prod-081", "Tool K", "TL-K-081", 34.99, 290),
    product("prod-082", "Tool L", "TL-L-082", 44.99, 280),
    product("prod-083", "Tool M", "TL-M-083", 54.99, 265),
    product("prod-084", "Tool N", "TL-N-084", 64.99, 255),
    product("prod-085", "Tool O", "TL-O-085", 74.99, 245),
    product("prod-086", "Tool P", "TL-P-086", 84.99, 235),
    product("prod-087", "Tool Q", "TL-Q-087", 94.99, 225),
    product("prod-088", "Tool R", "TL-R-088", 104.99, 215),
    product("prod-089", "Tool S", "TL-S-089", 114.99, 205),
    product("prod-090", "Tool T", "TL-T-090", 124.99, 195),
    product("prod-091", "Device A", "DVC-A-091", 1299.99, 30),
    product("prod-092", "Device B", "DVC-B-092", 1399.99, 25),
    product("prod-093", "Device C", "DVC-C-093", 1499.99, 20),
    product("prod-094", "Device D", "DVC-D-094", 1599.99, 15),
    product("prod-095", "Device E", "DVC-E-095", 1699.99, 35),
    product("prod-096", "Device F", "DVC-F-096", 1799.99, 28),
    product("prod-097", "Device G", "DVC-G-097", 1899.99, 22),
    product("prod-098", "Device H", "DVC-H-098", 1999.99, 18),
    product("prod-099", "Device I", "DVC-I-099", 2099.99, 12),
    product("prod-100", "Device J", "DVC-J-100", 2199.99, 8),
    product("prod-101", "Component A", "CMP-A-101", 24.99, 500),
    product("prod-102", "Component B", "CMP-B-102", 29.99, 480),
    product("prod-103", "Component C", "CMP-C-103", 34.99, 460),
    product("prod-104", "Component D", "CMP-D-104", 39.99, 440),
    product("prod-105", "Component E", "CMP-E-105", 44.99, 520),
    product("prod-106", "Component F", "CMP-F-106", 49.99, 490),
    product("prod-107", "Component G", "CMP-G-107", 54.99, 470),
    product("prod-108", "Component H", "CMP-H-108", 59.99, 450),
    product("prod-109", "Component I", "CMP-I-109", 64.99, 430),
    product("prod-110", "Component J", "CMP-J-110", 69.99, 510),
    product("prod-111", "Component K", "CMP-K-111", 19.99, 550),
    product("prod-112", "Component L", "CMP-L-112", 22.99, 530),
    product("prod-113", "Component M", "CMP-M-113", 27.99, 505),
    product("prod-114", "Component N", "CMP-N-114", 32.99, 485),
    product("prod-115", "Component O", "CMP-O-115", 37.99, 465),
    product("prod-116", "Component P", "CMP-P-116", 42.99, 545),
    product("prod-117", "Component Q", "CMP-Q-117", 47.99, 525),
    product("prod-118", "Component R", "CMP-R-118", 52.99, 515),
    product("prod-119", "Component S", "CMP-S-119", 57.99, 495),
    product("prod-120", "Component T", "CMP-T-120", 62.99, 475),
    product("prod-121", "Accessory A", "ACC-A-121", 14.99, 600),
    product("prod-122", "Accessory B", "ACC-B-122", 16.99, 580),
    product("prod-123", "Accessory C", "ACC-C-123", 18.99, 560),
    product("prod-124", "Accessory D", "ACC-D-124", 20.99, 540),
    product("prod-125", "Accessory E", "ACC-E-125", 22.99, 620),
    product("prod-126", "Accessory F", "ACC-F-126", 24.99, 590),
    product("prod-127", "Accessory G", "ACC-G-127", 26.99, 570),
    product("prod-128", "Accessory H", "ACC-H-128", 28.99, 550),
    product("prod-129", "Accessory I", "ACC-I-129", 30.99, 530),
    product("prod-130", "Accessory J", "ACC-J-130", 32.99, 610),
    product("prod-131", "Accessory K", "ACC-K-131", 12.99, 650),
    product("prod-132", "Accessory L", "ACC-L-132", 13.99, 630),
    product("prod-133", "Accessory M", "ACC-M-133", 15.99, 605),
    product("prod-134", "Accessory N", "ACC-N-134", 17.99, 585),
    product("prod-135", "Accessory O", "ACC-O-135", 19.99, 565),
    product("prod-136", "Accessory P", "ACC-P-136", 21.99, 645),
    product("prod-137", "Accessory Q", "ACC-Q-137", 23.99, 625),
    product("prod-138", "Accessory R", "ACC-R-138", 25.99, 615),
    product("prod-139", "Accessory S", "ACC-S-139", 27.99, 595),
    product("prod-140", "Accessory T", "ACC-T-140", 29.99, 575),
    product("prod-141", "Premium A", "PRM-A-141", 2499.99, 5),
    product("prod-142", "Premium B", "PRM-B-142", 2599.99, 4),
    product("prod-143", "Premium C", "PRM-C-143", 2699.99, 3),
    product("prod-144", "Premium D", "PRM-D-144", 2799.99, 6),
    product("prod-145", "Premium E", "PRM-E-145", 2899.99, 7),
    product("prod-146", "Premium F", "PRM-F-146", 2999.99, 2),
    product("prod-147", "Premium G", "PRM-G-147", 3099.99, 8),
    product("prod-148", "Premium H", "PRM-H-148", 3199.99, 9),
    product("prod-149", "Premium I", "PRM-I-149", 3299.99, 1),
    product("prod-150", "Premium J", "PRM-J-150", 3399.99, 10),
];

impl Product {
    /// JSON row as returned by the query activity.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id,
            "label": self.label,
            "name": self.label,
            "sku": self.sku,
            "price": self.price,
            "stock": self.stock,
        })
    }
}

/// Whether `id` names a product of the catalogue.
#[must_use]
pub fn is_known_product(id: &str) -> bool {
    MOCK_PRODUCTS.iter().any(|p| p.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalogue_has_unique_ids() {
        assert_eq!(MOCK_PRODUCTS.len(), 150);
        let mut ids: Vec<_> = MOCK_PRODUCTS.iter().map(|p| p.id).collect();
        ids.dedup();
        assert_eq!(ids.len(), 150);
        assert!(is_known_product("prod-150"));
        assert!(!is_known_product("prod-151"));
    }
}
