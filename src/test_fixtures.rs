//! Shared unit-test fixtures: the Care Bears schema and graph.

use crate::graph::Graph;
use crate::schema::Schema;
use serde_json::{json, Value};

pub(crate) fn care_bear_schema_value() -> Value {
    json!({
        "resources": {
            "bears": {
                "attributes": {
                    "id": "string",
                    "name": "string",
                    "yearIntroduced": "integer",
                    "bellyBadge": "string",
                    "furColor": "string"
                },
                "relationships": {
                    "home": { "type": "homes", "cardinality": "one", "inverse": "residents" },
                    "powers": { "type": "powers", "cardinality": "many", "inverse": "wielders" },
                    "bestFriend": { "type": "bears", "cardinality": "one", "inverse": "bestFriend" }
                }
            },
            "homes": {
                "attributes": {
                    "id": "string",
                    "name": "string",
                    "location": "string",
                    "caringMeter": "number",
                    "isInClouds": "boolean"
                },
                "relationships": {
                    "residents": { "type": "bears", "cardinality": "many", "inverse": "home" }
                }
            },
            "powers": {
                "idAttribute": "powerId",
                "attributes": {
                    "powerId": "string",
                    "name": "string",
                    "description": "string",
                    "type": "string"
                },
                "relationships": {
                    "wielders": { "type": "bears", "cardinality": "many", "inverse": "powers" }
                }
            }
        }
    })
}

pub(crate) fn care_bear_schema() -> Schema {
    Schema::from_value(care_bear_schema_value()).expect("care bear schema compiles")
}

pub(crate) fn care_bear_graph_value() -> Value {
    json!({
        "bears": {
            "1": {
                "attributes": {
                    "name": "Tenderheart Bear",
                    "yearIntroduced": 1982,
                    "bellyBadge": "red heart with pink outline",
                    "furColor": "tan"
                },
                "relationships": {
                    "home": { "type": "homes", "id": "1" },
                    "powers": [{ "type": "powers", "id": "careBearStare" }],
                    "bestFriend": null
                }
            },
            "2": {
                "attributes": {
                    "name": "Cheer Bear",
                    "yearIntroduced": 1982,
                    "bellyBadge": "rainbow",
                    "furColor": "carnation pink"
                },
                "relationships": {
                    "home": { "type": "homes", "id": "1" },
                    "powers": [{ "type": "powers", "id": "careBearStare" }],
                    "bestFriend": { "type": "bears", "id": "3" }
                }
            },
            "3": {
                "attributes": {
                    "name": "Wish Bear",
                    "yearIntroduced": 1982,
                    "bellyBadge": "shooting star",
                    "furColor": "turquoise"
                },
                "relationships": {
                    "home": { "type": "homes", "id": "1" },
                    "powers": [
                        { "type": "powers", "id": "careBearStare" },
                        { "type": "powers", "id": "makeWish" }
                    ],
                    "bestFriend": { "type": "bears", "id": "2" }
                }
            },
            "5": {
                "attributes": {
                    "name": "Smart Heart Bear",
                    "yearIntroduced": 2005,
                    "bellyBadge": "red apple with a white heart-shaped shine",
                    "furColor": "watermelon pink"
                },
                "relationships": {
                    "home": null,
                    "powers": [],
                    "bestFriend": null
                }
            }
        },
        "homes": {
            "1": {
                "attributes": {
                    "name": "Care-a-Lot",
                    "location": "Kingdom of Caring",
                    "caringMeter": 1,
                    "isInClouds": true
                },
                "relationships": {
                    "residents": [
                        { "type": "bears", "id": "1" },
                        { "type": "bears", "id": "2" },
                        { "type": "bears", "id": "3" }
                    ]
                }
            },
            "2": {
                "attributes": {
                    "name": "Forest of Feelings",
                    "location": "Earth",
                    "caringMeter": 0.5,
                    "isInClouds": false
                },
                "relationships": { "residents": [] }
            }
        },
        "powers": {
            "careBearStare": {
                "attributes": {
                    "name": "Care Bear Stare",
                    "description": "Purges evil-doers through the power of caring.",
                    "type": "group power"
                },
                "relationships": {
                    "wielders": [
                        { "type": "bears", "id": "1" },
                        { "type": "bears", "id": "2" },
                        { "type": "bears", "id": "3" }
                    ]
                }
            },
            "makeWish": {
                "attributes": {
                    "name": "Make a Wish",
                    "description": "Makes a wish on Twinkers.",
                    "type": "individual power"
                },
                "relationships": {
                    "wielders": [{ "type": "bears", "id": "3" }]
                }
            }
        }
    })
}

pub(crate) fn care_bear_graph() -> Graph {
    Graph::from_value(&care_bear_schema(), care_bear_graph_value())
        .expect("care bear graph loads")
}
